use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use types::{Instance, ReschedulingOption};
use utoipa::ToSchema;

pub const SCHEDULE_CHANGE_TEMPLATE: &str = "schedule_change";

/// Who has to hear about an executed option, and with which template.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPlan {
    pub template: String,
    pub instructor_ids: BTreeSet<String>,
    pub student_ids: BTreeSet<String>,
    pub summary: String,
}

impl NotificationPlan {
    pub fn for_option(option: &ReschedulingOption, inst: &Instance) -> Self {
        let mut instructor_ids = BTreeSet::new();
        let mut courses = BTreeSet::new();
        for c in &option.changes {
            for a in c.original.iter().chain(c.new.iter()) {
                instructor_ids.insert(a.instructor_id.0.clone());
                courses.insert(&a.course_id);
            }
        }
        let student_ids = inst
            .students
            .iter()
            .filter(|s| s.enrolled_course_ids.iter().any(|c| courses.contains(&c)))
            .map(|s| s.id.0.clone())
            .collect();
        Self {
            template: SCHEDULE_CHANGE_TEMPLATE.into(),
            instructor_ids,
            student_ids,
            summary: format!("{}: {}", option.title, option.description),
        }
    }

    pub fn recipients(&self) -> usize {
        self.instructor_ids.len() + self.student_ids.len()
    }
}

/// Delivery channel for notification plans. Delivery itself lives outside
/// this crate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, plan: &NotificationPlan) -> anyhow::Result<()>;
}

/// Records plans in the log instead of delivering them.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, plan: &NotificationPlan) -> anyhow::Result<()> {
        info!(
            template = %plan.template,
            recipients = plan.recipients(),
            summary = %plan.summary,
            "notification queued"
        );
        Ok(())
    }
}
