//! Disruption handling: live events, rescheduling options, and their
//! execution with rollback.

pub mod detector;
pub mod executor;
pub mod notify;
pub mod options;
pub mod simulate;

use thiserror::Error;
use types::{EventId, EventStatus};

pub use detector::{new_event, DisruptionDetector, SubscriptionId};
pub use executor::{execute, execute_for_event, rollback};
pub use notify::{LogNotifier, NotificationPlan, Notifier};
pub use options::generate_options;
pub use simulate::DisruptionSimulator;

#[derive(Debug, Error)]
pub enum DisruptionError {
    #[error("unknown disruption event {0}")]
    UnknownEvent(EventId),
    #[error("disruption event {0} is {1:?}, not active")]
    NotActive(EventId, EventStatus),
    #[error("disruption event {0} was already reported")]
    Duplicate(EventId),
}
