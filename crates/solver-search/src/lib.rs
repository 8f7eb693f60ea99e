//! Backtracking constraint search over structurally valid candidates.
//!
//! The search keeps an explicit stack of decision frames instead of
//! recursing, so the iteration cap, the wall-clock limit and cancellation are
//! all checked at every frame boundary. The next course is always the one
//! with the fewest options still compatible with the running assignment set,
//! recomputed after every placement.

use async_trait::async_trait;
use sched_core::audit::{audit, unplaced};
use sched_core::scoring::compute_soft_scores;
use sched_core::{
    Budget, CancelToken, Candidate, ConflictInfo, ConflictKind, Exhausted, GenerationConfig,
    GenerationRequest, Instance, Occupancy, OptimizationResult, Prep, Severity, Solver, Strategy,
};
use tracing::{debug, info, warn};

pub struct SearchSolver;

impl SearchSolver {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, inst: &Instance, cfg: &GenerationConfig, cancel: &CancelToken) -> OptimizationResult {
        let prep = Prep::new(inst);
        let feas = prep.build_feasible();
        let mut budget = Budget::new(cfg, cancel.clone());

        let mut conflicts: Vec<ConflictInfo> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        for (ci, opts) in feas.iter().enumerate() {
            if opts.is_empty() {
                conflicts.push(unplaced(&prep, &Occupancy::new(), ci, opts));
            } else {
                open.push(ci);
            }
        }
        let variables: usize = feas.iter().map(Vec::len).sum();
        debug!(variables, open = open.len(), "search domain built");

        let (outcome, best) = search(&prep, &feas, &open, &mut budget);

        let assignments: Vec<_> = match outcome {
            Outcome::Solved => best.iter().map(|&c| prep.assignment(c)).collect(),
            Outcome::Exhausted => {
                let mut occ = Occupancy::new();
                for &c in &best {
                    occ.place(&prep, c);
                }
                for &ci in &open {
                    if !occ.is_placed(ci) {
                        conflicts.push(unplaced(&prep, &occ, ci, &feas[ci]));
                    }
                }
                best.iter().map(|&c| prep.assignment(c)).collect()
            }
            Outcome::Limit { reason, course } => {
                let id = &inst.courses[course].id;
                warn!(course = %id, reason = reason.describe(), "search aborted");
                conflicts.push(
                    ConflictInfo::new(
                        ConflictKind::SearchLimit,
                        Severity::Critical,
                        format!("{} while placing {}", reason.describe(), id),
                    )
                    .affecting(id)
                    .suggest("raise the iteration or time limit, or relax constraints"),
                );
                Vec::new()
            }
        };
        conflicts.extend(audit(&prep, &assignments));

        let success = conflicts.is_empty();
        let score = if success { 100 } else { 0 };
        info!(
            outcome = outcome.label(),
            placed = assignments.len(),
            iterations = budget.iterations(),
            "constraint search finished"
        );

        OptimizationResult {
            success,
            stats: serde_json::json!({
                "method": "constraint_search",
                "outcome": outcome.label(),
                "variables": variables,
                "excluded": inst.courses.len() - open.len(),
                "deepest": best.len(),
                "soft": compute_soft_scores(inst, &assignments),
            }),
            assignments,
            conflicts,
            score,
            elapsed_ms: budget.elapsed_ms(),
            strategy_used: Strategy::ConstraintSearch,
            iterations: budget.iterations(),
        }
    }
}

impl Default for SearchSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for SearchSolver {
    async fn solve(
        &self,
        req: GenerationRequest,
        cancel: CancelToken,
    ) -> anyhow::Result<OptimizationResult> {
        Ok(self.run(&req.instance, &req.config, &cancel))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Solved,
    /// Every branch failed; the deepest partial set is kept for reporting.
    Exhausted,
    Limit { reason: Exhausted, course: usize },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Solved => "solved",
            Outcome::Exhausted => "exhausted",
            Outcome::Limit { .. } => "limit",
        }
    }
}

/// One decision: which option of `course` is committed, and which to try next.
#[derive(Debug)]
struct Frame {
    course: usize,
    options: Vec<Candidate>,
    cursor: usize,
    placed: Option<Candidate>,
}

/// Most constrained open course given the running set. Ties go to the course
/// with more conflict-graph neighbours, then to input order.
fn next_frame(prep: &Prep<'_>, feas: &[Vec<Candidate>], occ: &Occupancy, open: &[usize]) -> Option<Frame> {
    open.iter()
        .copied()
        .filter(|&ci| !occ.is_placed(ci))
        .map(|ci| {
            let options: Vec<Candidate> = feas[ci]
                .iter()
                .copied()
                .filter(|&c| occ.fits(prep, c))
                .collect();
            (ci, options)
        })
        .min_by(|(a, ao), (b, bo)| {
            ao.len()
                .cmp(&bo.len())
                .then(prep.neighbors[*b].len().cmp(&prep.neighbors[*a].len()))
                .then(a.cmp(b))
        })
        .map(|(course, options)| Frame {
            course,
            options,
            cursor: 0,
            placed: None,
        })
}

fn search(
    prep: &Prep<'_>,
    feas: &[Vec<Candidate>],
    open: &[usize],
    budget: &mut Budget,
) -> (Outcome, Vec<Candidate>) {
    let mut occ = Occupancy::new();
    let mut best: Vec<Candidate> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    match next_frame(prep, feas, &occ, open) {
        Some(f) => stack.push(f),
        None => return (Outcome::Solved, best),
    }

    loop {
        let Some(top) = stack.last_mut() else {
            return (Outcome::Exhausted, best);
        };
        if let Err(reason) = budget.check() {
            return (
                Outcome::Limit {
                    reason,
                    course: top.course,
                },
                best,
            );
        }
        if let Some(prev) = top.placed.take() {
            occ.remove(prep, prev);
        }
        if top.cursor >= top.options.len() {
            stack.pop();
            continue;
        }
        if let Err(reason) = budget.tick() {
            return (
                Outcome::Limit {
                    reason,
                    course: top.course,
                },
                best,
            );
        }

        let cand = top.options[top.cursor];
        top.cursor += 1;
        if !occ.fits(prep, cand) {
            continue;
        }
        occ.place(prep, cand);
        top.placed = Some(cand);

        if occ.len() > best.len() {
            best = occ.placements();
        }
        if occ.len() == open.len() {
            return (Outcome::Solved, occ.placements());
        }
        if let Some(f) = next_frame(prep, feas, &occ, open) {
            stack.push(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::testkit::*;

    #[test]
    fn most_constrained_course_goes_first() {
        let mut inst = two_course_instance(false);
        inst.courses[1].required_expertise_tags = ["rare".to_string()].into();
        inst.instructors[0].expertise_tags.insert("rare".into());

        let prep = Prep::new(&inst);
        let feas = prep.build_feasible();
        assert_eq!(feas[0].len(), 4);
        let f = next_frame(&prep, &feas, &Occupancy::new(), &[0, 1]).unwrap();
        assert_eq!(f.course, 1);
        assert_eq!(f.options.len(), 2);
    }

    #[test]
    fn ordering_reacts_to_placements() {
        let inst = scenario_a();
        let prep = Prep::new(&inst);
        let feas = prep.build_feasible();
        let mut occ = Occupancy::new();
        occ.place(
            &prep,
            Candidate {
                course: 2,
                instructor: 1,
                room: 0,
                slot: 0,
            },
        );
        let f = next_frame(&prep, &feas, &occ, &[0, 1, 2]).unwrap();
        assert_eq!(f.course, 0);
        assert_eq!(f.options.len(), 3);
        assert!(f.options.iter().all(|c| c.slot != 0));
    }

    #[test]
    fn iteration_cap_discards_partial_work() {
        let inst = scenario_b();
        let cfg = GenerationConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let r = SearchSolver::new().run(&inst, &cfg, &CancelToken::new());
        assert!(!r.success);
        assert!(r.assignments.is_empty());
        assert_eq!(r.score, 0);
        let c = &r.conflicts[0];
        assert_eq!(c.kind, ConflictKind::SearchLimit);
        assert!(c.description.contains("max iterations reached"));
    }
}
