use disruption::{DisruptionDetector, LogNotifier, Notifier};
use engine::DispatchSolver;
use jobs::InMemJobs;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<DispatchSolver>>,
    pub detector: Arc<DisruptionDetector>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new_default() -> Self {
        let detector = Arc::new(DisruptionDetector::new());
        detector.subscribe(|e| {
            tracing::warn!(
                event = %e.id,
                kind = ?e.kind,
                resources = e.affected_resources.len(),
                "disruption is active"
            );
        });
        Self {
            jobs: Arc::new(InMemJobs::new(DispatchSolver::new())),
            detector,
            notifier: Arc::new(LogNotifier),
        }
    }
}
