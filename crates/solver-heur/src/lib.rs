use async_trait::async_trait;
use sched_core::audit::{audit, unplaced};
use sched_core::scoring::compute_soft_scores;
use sched_core::{
    CancelToken, Candidate, ConflictInfo, ConflictKind, GenerationConfig, GenerationRequest,
    Instance, Occupancy, OptimizationResult, Prep, Severity, Solver, Strategy,
};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

/// Single pass, most advanced semester first, first fit.
pub struct GreedySolver;

impl GreedySolver {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, inst: &Instance, cfg: &GenerationConfig, cancel: &CancelToken) -> OptimizationResult {
        let started = Instant::now();
        let prep = Prep::new(inst);
        let mut occ = Occupancy::new();
        let mut placed: Vec<Candidate> = Vec::new();
        let mut conflicts: Vec<ConflictInfo> = Vec::new();
        let mut steps = 0u64;

        let mut order: Vec<usize> = (0..inst.courses.len()).collect();
        order.sort_by(|&a, &b| inst.courses[b].semester.cmp(&inst.courses[a].semester));

        for ci in order {
            let course = &inst.courses[ci];
            if cancel.is_cancelled() {
                conflicts.push(
                    ConflictInfo::new(ConflictKind::SearchLimit, Severity::Critical, "run cancelled")
                        .affecting(&course.id),
                );
                break;
            }
            let Some(ii) = pick_instructor(inst, ci) else {
                conflicts.push(unplaced(&prep, &occ, ci, &[]));
                continue;
            };

            let mut chosen = None;
            'slots: for si in slot_order(inst, ii) {
                steps += 1;
                if occ.instructor_busy(ii, si) || !inst.instructors[ii].is_available(&inst.slots[si]) {
                    continue;
                }
                for ri in 0..inst.rooms.len() {
                    let c = Candidate {
                        course: ci,
                        instructor: ii,
                        room: ri,
                        slot: si,
                    };
                    if prep.structurally_valid(c) && occ.fits(&prep, c) {
                        chosen = Some(c);
                        break 'slots;
                    }
                }
            }

            match chosen {
                Some(c) => {
                    occ.place(&prep, c);
                    placed.push(c);
                    debug!(course = %course.id, slot = %inst.slots[c.slot].id, "placed");
                }
                None => {
                    let options: Vec<Candidate> = prep
                        .options_for(ci)
                        .into_iter()
                        .filter(|o| o.instructor == ii)
                        .collect();
                    conflicts.push(unplaced(&prep, &occ, ci, &options));
                }
            }
        }

        let assignments: Vec<_> = placed.iter().map(|&c| prep.assignment(c)).collect();
        conflicts.extend(audit(&prep, &assignments));

        let score = 100u32.saturating_sub(10 * conflicts.len() as u32);
        let success = conflicts.is_empty() || (cfg.conflict_tolerance && !assignments.is_empty());
        let soft = compute_soft_scores(inst, &assignments);
        info!(
            placed = assignments.len(),
            conflicts = conflicts.len(),
            score,
            "greedy finished"
        );

        OptimizationResult {
            success,
            stats: serde_json::json!({
                "method": "greedy",
                "courses": inst.courses.len(),
                "placed": assignments.len(),
                "conflictGraphEdges": prep.graph.edge_count(),
                "soft": soft,
            }),
            assignments,
            conflicts,
            score,
            elapsed_ms: started.elapsed().as_millis() as u64,
            strategy_used: Strategy::Greedy,
            iterations: steps,
        }
    }
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for GreedySolver {
    async fn solve(
        &self,
        req: GenerationRequest,
        cancel: CancelToken,
    ) -> anyhow::Result<OptimizationResult> {
        Ok(self.run(&req.instance, &req.config, &cancel))
    }
}

fn words(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// Department or specialization match, qualified ones first among the
/// matches; without any match, the first instructor in input order.
pub fn pick_instructor(inst: &Instance, course: usize) -> Option<usize> {
    let c = &inst.courses[course];
    let title = words(&c.name);
    let matches = |i: usize| {
        let ins = &inst.instructors[i];
        ins.department == c.department
            || ins
                .specialization
                .as_deref()
                .is_some_and(|s| !words(s).is_disjoint(&title))
    };
    let qualified = |i: usize| inst.instructors[i].has_expertise_for(c);
    let all = 0..inst.instructors.len();

    all.clone()
        .find(|&i| matches(i) && qualified(i))
        .or_else(|| all.clone().find(|&i| matches(i)))
        .or_else(|| all.clone().next())
}

/// Preferred slot names in preference order, then every other slot in input order.
pub fn slot_order(inst: &Instance, instructor: usize) -> Vec<usize> {
    let prefs = &inst.instructors[instructor].preferred_slot_names;
    let mut out: Vec<usize> = Vec::with_capacity(inst.slots.len());
    let mut seen = vec![false; inst.slots.len()];
    for name in prefs {
        for (si, s) in inst.slots.iter().enumerate() {
            if &s.slot_name == name && !seen[si] {
                seen[si] = true;
                out.push(si);
            }
        }
    }
    out.extend((0..inst.slots.len()).filter(|&si| !seen[si]));
    out
}
