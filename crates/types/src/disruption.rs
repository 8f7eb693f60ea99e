//! Live disruption events and the rescheduling records derived from them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

use crate::{Assignment, ConflictInfo, DayOfWeek, EventId, OptionId};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    InstructorAbsence,
    RoomUnavailable,
    EquipmentFailure,
    Closure,
    Weather,
    Maintenance,
    ConflictingEvent,
    StudentEmergency,
}

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Ord, PartialOrd, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum DisruptionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Instructor,
    Room,
    Course,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Direct,
    Indirect,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
pub struct AffectedResource {
    pub kind: ResourceKind,
    pub id: String,
    pub impact: Impact,
}

impl AffectedResource {
    pub fn direct(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            impact: Impact::Direct,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Resolved,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionEvent {
    pub id: EventId,
    pub kind: DisruptionKind,
    pub severity: DisruptionSeverity,
    #[serde(default)]
    pub description: String,
    pub affected_resources: Vec<AffectedResource>,
    /// Days the disruption covers; empty means the whole week.
    #[serde(default)]
    pub affected_days: BTreeSet<DayOfWeek>,
    pub status: EventStatus,
    #[schema(value_type = String)]
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DisruptionEvent {
    pub fn covers_day(&self, day: DayOfWeek) -> bool {
        self.affected_days.is_empty() || self.affected_days.contains(&day)
    }

    pub fn hits(&self, kind: ResourceKind, id: &str) -> bool {
        self.affected_resources
            .iter()
            .any(|r| r.kind == kind && r.id == id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAssessment {
    pub students_affected: u32,
    pub instructors_affected: u32,
    pub rooms_affected: u32,
    pub courses_affected: u32,
    pub severity: DisruptionSeverity,
    pub estimated_disruption_hours: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Move,
    Cancel,
    Split,
    Merge,
    Substitute,
}

/// Replaces `original` with `new` in a schedule. A missing `original` adds a
/// session, a missing `new` drops one.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleChange {
    pub kind: ChangeKind,
    #[serde(default)]
    pub original: Option<Assignment>,
    #[serde(default)]
    pub new: Option<Assignment>,
    pub reason: String,
    pub affected_students: u32,
    pub affected_instructors: u32,
}

impl ScheduleChange {
    /// The change that undoes this one.
    pub fn inverted(&self) -> Self {
        Self {
            kind: self.kind,
            original: self.new.clone(),
            new: self.original.clone(),
            reason: format!("rollback: {}", self.reason),
            affected_students: self.affected_students,
            affected_instructors: self.affected_instructors,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    SameDayMove,
    Postpone,
    Split,
    Substitute,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulingOption {
    pub id: OptionId,
    pub kind: OptionKind,
    pub title: String,
    pub description: String,
    pub impact: ImpactAssessment,
    pub changes: Vec<ScheduleChange>,
    /// 0.0..=1.0.
    pub confidence: f64,
    pub estimated_resolution_minutes: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
pub struct RollbackPlan {
    pub changes: Vec<ScheduleChange>,
}

impl RollbackPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub schedule: Vec<Assignment>,
    pub rollback: RollbackPlan,
    pub conflicts: Vec<ConflictInfo>,
    pub elapsed_ms: u64,
    pub message: String,
}
