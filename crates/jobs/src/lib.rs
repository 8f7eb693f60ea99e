use parking_lot::RwLock;
use sched_core::{CancelToken, GenerationRequest, OptimizationResult, Solver};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done { result: OptimizationResult },
    Failed { message: String },
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Done { .. } | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }
}

struct Entry {
    status: JobStatus,
    cancel: CancelToken,
}

/// Generation runs keyed by job id, each on its own tokio task. Finished
/// jobs stay until `purge_finished` is called.
pub struct InMemJobs<S: Solver> {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    solver: Arc<S>,
}

impl<S: Solver> Clone for InMemJobs<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            solver: self.solver.clone(),
        }
    }
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self {
            inner: Default::default(),
            solver: Arc::new(solver),
        }
    }

    pub fn enqueue(&self, req: GenerationRequest) -> JobId {
        let id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        self.inner.write().insert(
            id.clone(),
            Entry {
                status: JobStatus::Queued,
                cancel: cancel.clone(),
            },
        );

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            if cancel.is_cancelled() {
                return;
            }
            set(&map, &id_for_task, JobStatus::Running);
            let strategy = req.config.strategy;
            let status = match solver.solve(req, cancel.clone()).await {
                _ if cancel.is_cancelled() => JobStatus::Cancelled,
                Ok(result) => {
                    info!(job = %id_for_task, %strategy, success = result.success, "job done");
                    JobStatus::Done { result }
                }
                Err(e) => {
                    error!(job = %id_for_task, error = %e, "job failed");
                    JobStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
            set(&map, &id_for_task, status);
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).map(|e| e.status.clone())
    }

    /// Signals the run to stop. `None` for an unknown job, `Some(false)` when
    /// it had already finished.
    pub fn cancel(&self, id: &str) -> Option<bool> {
        let mut w = self.inner.write();
        let entry = w.get_mut(id)?;
        if entry.status.is_finished() {
            return Some(false);
        }
        entry.cancel.cancel();
        if matches!(entry.status, JobStatus::Queued) {
            entry.status = JobStatus::Cancelled;
        }
        info!(job = %id, "job cancellation requested");
        Some(true)
    }

    /// Drops every finished job and returns how many were dropped. Queued
    /// and running jobs are kept.
    pub fn purge_finished(&self) -> usize {
        let mut w = self.inner.write();
        let before = w.len();
        w.retain(|_, e| !e.status.is_finished());
        let dropped = before - w.len();
        if dropped > 0 {
            info!(dropped, "finished jobs purged");
        }
        dropped
    }
}

fn set(map: &RwLock<HashMap<String, Entry>>, id: &str, status: JobStatus) {
    if let Some(e) = map.write().get_mut(id) {
        e.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine::DispatchSolver;
    use sched_core::testkit::scenario_a;
    use sched_core::GenerationConfig;

    async fn wait_finished<S: Solver>(jobs: &InMemJobs<S>, id: &JobId) -> JobStatus {
        for _ in 0..10_000 {
            match jobs.get(&id.0) {
                Some(s) if s.is_finished() => return s,
                _ => tokio::task::yield_now().await,
            }
        }
        panic!("job {} never finished", id.0);
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            instance: scenario_a(),
            config: GenerationConfig::default(),
        }
    }

    #[tokio::test]
    async fn job_runs_to_done() {
        let jobs = InMemJobs::new(DispatchSolver::new());
        let id = jobs.enqueue(request());
        match wait_finished(&jobs, &id).await {
            JobStatus::Done { result } => {
                assert!(result.success);
                assert_eq!(result.assignments.len(), 3);
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(jobs.cancel(&id.0), Some(false));
    }

    #[tokio::test]
    async fn purge_drops_only_finished_jobs() {
        let jobs = InMemJobs::new(DispatchSolver::new());
        let done = jobs.enqueue(request());
        wait_finished(&jobs, &done).await;

        let waiting = InMemJobs::new(UntilCancelled);
        let running = waiting.enqueue(request());
        while !matches!(waiting.get(&running.0), Some(JobStatus::Running)) {
            tokio::task::yield_now().await;
        }

        assert_eq!(jobs.purge_finished(), 1);
        assert!(jobs.get(&done.0).is_none());
        assert_eq!(waiting.purge_finished(), 0);
        assert!(waiting.get(&running.0).is_some());
        waiting.cancel(&running.0);
    }

    #[tokio::test]
    async fn invalid_instance_fails_the_job() {
        let jobs = InMemJobs::new(DispatchSolver::new());
        let mut req = request();
        req.instance.slots.clear();
        let id = jobs.enqueue(req);
        match wait_finished(&jobs, &id).await {
            JobStatus::Failed { message } => assert!(message.contains("slots is empty")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    struct UntilCancelled;

    #[async_trait]
    impl Solver for UntilCancelled {
        async fn solve(
            &self,
            _req: GenerationRequest,
            cancel: CancelToken,
        ) -> anyhow::Result<OptimizationResult> {
            while !cancel.is_cancelled() {
                tokio::task::yield_now().await;
            }
            anyhow::bail!("stopped")
        }
    }

    #[tokio::test]
    async fn running_job_can_be_cancelled() {
        let jobs = InMemJobs::new(UntilCancelled);
        let id = jobs.enqueue(request());
        while !matches!(jobs.get(&id.0), Some(JobStatus::Running)) {
            tokio::task::yield_now().await;
        }
        assert_eq!(jobs.cancel(&id.0), Some(true));
        assert!(matches!(wait_finished(&jobs, &id).await, JobStatus::Cancelled));
        assert_eq!(jobs.cancel("missing"), None);
    }
}
