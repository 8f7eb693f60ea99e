use proptest::prelude::*;
use sched_core::testkit::*;
use sched_core::{CancelToken, GenerationConfig, GenerationRequest, Solver};
use solver_heur::GreedySolver;
use types::{ConflictKind, Severity, Strategy as SolveStrategy};

fn run(inst: &types::Instance) -> types::OptimizationResult {
    GreedySolver::new().run(inst, &GenerationConfig::default(), &CancelToken::new())
}

#[test]
fn unrelated_courses_all_placed() {
    let inst = scenario_a();
    let r = run(&inst);
    assert!(r.success);
    assert_eq!(r.assignments.len(), 3);
    assert_eq!(r.score, 100);
    assert_eq!(r.strategy_used, SolveStrategy::Greedy);
    check_invariants(&inst, &r.assignments).unwrap();
}

#[test]
fn shared_student_single_slot_places_exactly_one() {
    let inst = scenario_b();
    let r = run(&inst);
    assert_eq!(r.assignments.len(), 1);
    assert_eq!(r.assignments[0].course_id.0, "c1");
    assert_eq!(r.conflicts.len(), 1);
    let c = &r.conflicts[0];
    assert_eq!(c.kind, ConflictKind::Time);
    assert_eq!(c.severity, Severity::Critical);
    assert!(c.touches("c2"));
    assert_eq!(r.score, 90);
}

#[test]
fn missing_expertise_leaves_course_unassigned() {
    let inst = scenario_c();
    let r = run(&inst);
    assert!(r.assignment_for(&"quantum".into()).is_none());
    let c = r
        .conflicts
        .iter()
        .find(|c| c.touches("quantum"))
        .expect("conflict for quantum");
    assert_eq!(c.kind, ConflictKind::Structural);
    assert_eq!(c.severity, Severity::Critical);
}

#[test]
fn higher_semesters_are_placed_first() {
    let mut inst = two_course_instance(false);
    inst.slots.truncate(1);
    inst.instructors.truncate(1);
    inst.courses[1].semester = 4;
    let r = run(&inst);
    assert_eq!(r.assignments.len(), 1);
    assert_eq!(r.assignments[0].course_id.0, "c2");
}

#[tokio::test]
async fn solver_trait_runs_the_greedy() {
    let req = GenerationRequest {
        instance: scenario_a(),
        config: GenerationConfig::default(),
    };
    let r = GreedySolver::new().solve(req, CancelToken::new()).await.unwrap();
    assert_eq!(r.strategy_used, SolveStrategy::Greedy);
    assert_eq!(r.stats["method"], "greedy");
}

proptest! {
    #[test]
    fn never_returns_clashing_assignments(inst in arb_instance()) {
        let r = run(&inst);
        prop_assert!(check_invariants(&inst, &r.assignments).is_ok(), "{:?}", check_invariants(&inst, &r.assignments));
        prop_assert!(r.score <= 100);
        prop_assert_eq!(r.assignments.len() + r.conflicts.len() >= inst.courses.len(), true);
    }
}
