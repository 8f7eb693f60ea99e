pub mod disruption;

use chrono::{NaiveTime, Timelike};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use utoipa::ToSchema;

pub use disruption::*;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone,
            Debug,
            Default,
            Serialize,
            Deserialize,
            ToSchema,
            JsonSchema,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(CourseId);
id_newtype!(InstructorId);
id_newtype!(RoomId);
id_newtype!(SlotId);
id_newtype!(StudentId);
id_newtype!(ConstraintId);
id_newtype!(EventId);
id_newtype!(OptionId);

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    JsonSchema,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    #[default]
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "monday",
            DayOfWeek::Tue => "tuesday",
            DayOfWeek::Wed => "wednesday",
            DayOfWeek::Thu => "thursday",
            DayOfWeek::Fri => "friday",
            DayOfWeek::Sat => "saturday",
            DayOfWeek::Sun => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub fn of(time: NaiveTime) -> Self {
        match time.hour() {
            0..=11 => DayPeriod::Morning,
            12..=16 => DayPeriod::Afternoon,
            _ => DayPeriod::Evening,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CourseType {
    #[default]
    Major,
    Minor,
    SkillBased,
    Elective,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub department: String,
    #[serde(default)]
    pub semester: u32,
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub requires_lab: bool,
    #[serde(default)]
    pub course_type: CourseType,
    #[serde(default)]
    pub max_enrollment: u32,
    #[serde(default)]
    pub required_expertise_tags: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub expertise_tags: BTreeSet<String>,
    /// Zero means no weekly cap.
    #[serde(default)]
    pub max_hours_per_week: u32,
    #[serde(default)]
    pub preferred_slot_names: Vec<String>,
    /// A missing day or an empty set means the instructor does not teach that day.
    #[serde(default)]
    pub availability: BTreeMap<DayOfWeek, BTreeSet<SlotId>>,
}

impl Instructor {
    pub fn is_available(&self, slot: &TimeSlot) -> bool {
        self.availability
            .get(&slot.day)
            .is_some_and(|ids| ids.contains(&slot.id))
    }

    pub fn has_expertise_for(&self, course: &Course) -> bool {
        course.required_expertise_tags.is_empty()
            || course
                .required_expertise_tags
                .iter()
                .any(|t| self.expertise_tags.contains(t))
    }

    /// Weekly teaching limit in minutes; `None` when unlimited (0 hours).
    pub fn weekly_cap_minutes(&self) -> Option<u64> {
        (self.max_hours_per_week > 0).then(|| u64::from(self.max_hours_per_week) * 60)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Classroom,
    Lab,
    Auditorium,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub room_type: RoomType,
    pub capacity: u32,
    #[serde(default)]
    pub is_lab: bool,
    #[serde(default)]
    pub equipment: BTreeSet<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: SlotId,
    pub day: DayOfWeek,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub slot_name: String,
}

impl TimeSlot {
    pub fn duration_minutes(&self) -> u32 {
        let secs = (self.end_time - self.start_time).num_seconds().max(0);
        (secs / 60) as u32
    }

    pub fn period(&self) -> DayPeriod {
        DayPeriod::of(self.start_time)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    #[serde(default)]
    pub enrolled_course_ids: BTreeSet<CourseId>,
}

/// One placed course: who teaches it, where, and when.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub course_id: CourseId,
    pub instructor_id: InstructorId,
    pub room_id: RoomId,
    pub slot_id: SlotId,
    pub day: DayOfWeek,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Hard,
    Soft,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Prefer,
    Avoid,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Instructor,
    Room,
    Course,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
pub struct ConstraintScope {
    pub entity: EntityType,
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintPayload {
    TimeOfDay { period: DayPeriod, polarity: Polarity },
    Lab { polarity: Polarity },
    Equipment { item: String, polarity: Polarity },
    Day { day: DayOfWeek, polarity: Polarity },
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
pub struct Constraint {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
    /// 1 (weak) ..= 10 (must hold).
    pub priority: u8,
    pub description: String,
    pub scope: ConstraintScope,
    pub payload: ConstraintPayload,
}

impl Constraint {
    pub fn is_hard(&self) -> bool {
        self.kind == ConstraintKind::Hard
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Instructor,
    Room,
    Time,
    Preference,
    /// No structurally valid (instructor, room, slot) exists for the course.
    Structural,
    /// The search ran out of iterations or time, or was cancelled.
    SearchLimit,
}

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Ord, PartialOrd, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub affected_ids: Vec<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ConflictInfo {
    pub fn new(kind: ConflictKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            affected_ids: Vec::new(),
            suggestion: None,
        }
    }

    pub fn affecting(mut self, id: impl fmt::Display) -> Self {
        self.affected_ids.push(id.to_string());
        self
    }

    pub fn suggest(mut self, text: impl Into<String>) -> Self {
        self.suggestion = Some(text.into());
        self
    }

    pub fn touches(&self, id: &str) -> bool {
        self.affected_ids.iter().any(|x| x == id)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Greedy,
    ConstraintSearch,
    #[default]
    Hybrid,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Greedy => "greedy",
            Strategy::ConstraintSearch => "constraint_search",
            Strategy::Hybrid => "hybrid",
        })
    }
}

fn default_time_limit_ms() -> u64 {
    30_000
}
fn default_max_iterations() -> u64 {
    10_000
}
fn default_hybrid_threshold() -> u32 {
    70
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    /// Greedy runs with leftover conflicts still count as successful.
    #[serde(default)]
    pub conflict_tolerance: bool,
    #[serde(default = "default_hybrid_threshold")]
    pub hybrid_score_threshold: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            time_limit_ms: default_time_limit_ms(),
            max_iterations: default_max_iterations(),
            conflict_tolerance: false,
            hybrid_score_threshold: default_hybrid_threshold(),
        }
    }
}

/// Input snapshot for one generation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Instance {
    pub courses: Vec<Course>,
    pub instructors: Vec<Instructor>,
    pub rooms: Vec<Room>,
    pub slots: Vec<TimeSlot>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Instance {
    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| &c.id == id)
    }

    pub fn instructor(&self, id: &InstructorId) -> Option<&Instructor> {
        self.instructors.iter().find(|i| &i.id == id)
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    pub fn slot(&self, id: &SlotId) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| &s.id == id)
    }

    pub fn students_in(&self, course: &CourseId) -> impl Iterator<Item = &Student> + '_ {
        let course = course.clone();
        self.students
            .iter()
            .filter(move |s| s.enrolled_course_ids.contains(&course))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct GenerationRequest {
    pub instance: Instance,
    #[serde(default)]
    pub config: GenerationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub success: bool,
    pub assignments: Vec<Assignment>,
    pub conflicts: Vec<ConflictInfo>,
    /// 0..=100.
    pub score: u32,
    pub elapsed_ms: u64,
    pub strategy_used: Strategy,
    pub iterations: u64,
    pub stats: serde_json::Value,
}

impl OptimizationResult {
    pub fn assignment_for(&self, course: &CourseId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.course_id == course)
    }
}
