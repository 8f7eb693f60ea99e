//! Strategy selection over the greedy and constraint-search solvers.

use async_trait::async_trait;
use sched_core::{
    validate, CancelToken, GenerationConfig, GenerationRequest, Instance, OptimizationResult,
    Solver, Strategy,
};
use solver_heur::GreedySolver;
use solver_search::SearchSolver;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Greedy first; escalates to the constraint search when the greedy result
/// has conflicts or scores below the configured threshold.
#[derive(Default)]
pub struct HybridSolver {
    greedy: GreedySolver,
    search: SearchSolver,
}

impl HybridSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, inst: &Instance, cfg: &GenerationConfig, cancel: &CancelToken) -> OptimizationResult {
        let started = Instant::now();
        let mut greedy = self.greedy.run(inst, cfg, cancel);
        if greedy.conflicts.is_empty() && greedy.score >= cfg.hybrid_score_threshold {
            greedy.stats["escalated"] = serde_json::json!(false);
            return greedy;
        }

        info!(
            conflicts = greedy.conflicts.len(),
            score = greedy.score,
            threshold = cfg.hybrid_score_threshold,
            "escalating to constraint search"
        );
        let search = self.search.run(inst, cfg, cancel);
        let (greedy_score, search_score) = (greedy.score, search.score);
        let iterations = greedy.iterations + search.iterations;

        let mut best = if search.score > greedy.score {
            search
        } else {
            greedy
        };
        best.stats["escalated"] = serde_json::json!(true);
        best.stats["greedyScore"] = serde_json::json!(greedy_score);
        best.stats["searchScore"] = serde_json::json!(search_score);
        best.iterations = iterations;
        best.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(winner = %best.strategy_used, score = best.score, "hybrid finished");
        best
    }
}

#[async_trait]
impl Solver for HybridSolver {
    async fn solve(
        &self,
        req: GenerationRequest,
        cancel: CancelToken,
    ) -> anyhow::Result<OptimizationResult> {
        Ok(self.run(&req.instance, &req.config, &cancel))
    }
}

/// Validates the request, then routes it to the solver named by
/// `config.strategy`.
#[derive(Clone)]
pub struct DispatchSolver {
    greedy: Arc<GreedySolver>,
    search: Arc<SearchSolver>,
    hybrid: Arc<HybridSolver>,
}

impl DispatchSolver {
    pub fn new() -> Self {
        Self {
            greedy: Arc::new(GreedySolver::new()),
            search: Arc::new(SearchSolver::new()),
            hybrid: Arc::new(HybridSolver::new()),
        }
    }

    pub fn run(&self, inst: &Instance, cfg: &GenerationConfig, cancel: &CancelToken) -> OptimizationResult {
        match cfg.strategy {
            Strategy::Greedy => self.greedy.run(inst, cfg, cancel),
            Strategy::ConstraintSearch => self.search.run(inst, cfg, cancel),
            Strategy::Hybrid => self.hybrid.run(inst, cfg, cancel),
        }
    }
}

impl Default for DispatchSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for DispatchSolver {
    async fn solve(
        &self,
        req: GenerationRequest,
        cancel: CancelToken,
    ) -> anyhow::Result<OptimizationResult> {
        validate(&req.instance)?;
        info!(
            strategy = %req.config.strategy,
            courses = req.instance.courses.len(),
            "generation started"
        );
        Ok(self.run(&req.instance, &req.config, &cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::testkit::*;

    #[test]
    fn clean_greedy_result_is_not_escalated() {
        let r = HybridSolver::new().run(&scenario_a(), &GenerationConfig::default(), &CancelToken::new());
        assert!(r.success);
        assert_eq!(r.strategy_used, Strategy::Greedy);
        assert_eq!(r.stats["escalated"], false);
    }

    #[test]
    fn raised_threshold_forces_escalation() {
        let cfg = GenerationConfig {
            hybrid_score_threshold: 101,
            ..Default::default()
        };
        let r = HybridSolver::new().run(&scenario_a(), &cfg, &CancelToken::new());
        assert_eq!(r.stats["escalated"], true);
        // Equal scores keep the greedy result.
        assert_eq!(r.strategy_used, Strategy::Greedy);
        assert_eq!(r.stats["searchScore"], 100);
    }

    #[test]
    fn search_wins_when_greedy_picks_the_wrong_instructor() {
        let mut inst = two_course_instance(false);
        inst.instructors[0].availability = availability(&inst.slots[..1]);
        inst.instructors[1].department = "math".into();
        let r = HybridSolver::new().run(&inst, &GenerationConfig::default(), &CancelToken::new());
        assert!(r.success);
        assert_eq!(r.strategy_used, Strategy::ConstraintSearch);
        assert_eq!(r.score, 100);
        assert_eq!(r.stats["greedyScore"], 90);
    }

    #[test]
    fn partial_greedy_beats_failed_search() {
        let r = HybridSolver::new().run(&scenario_b(), &GenerationConfig::default(), &CancelToken::new());
        assert_eq!(r.strategy_used, Strategy::Greedy);
        assert_eq!(r.score, 90);
        assert_eq!(r.stats["searchScore"], 0);
    }

    #[tokio::test]
    async fn dispatch_rejects_invalid_instances() {
        let mut inst = scenario_a();
        inst.slots.clear();
        let req = GenerationRequest {
            instance: inst,
            config: GenerationConfig::default(),
        };
        let err = DispatchSolver::new().solve(req, CancelToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("slots is empty"));
    }
}
