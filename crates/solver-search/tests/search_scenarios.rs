use proptest::prelude::*;
use sched_core::testkit::*;
use sched_core::{CancelToken, GenerationConfig, GenerationRequest, Solver};
use solver_search::SearchSolver;
use types::{ConflictKind, Severity, Strategy as SolveStrategy};

fn run(inst: &types::Instance) -> types::OptimizationResult {
    SearchSolver::new().run(inst, &GenerationConfig::default(), &CancelToken::new())
}

#[test]
fn finds_complete_schedule() {
    let inst = scenario_a();
    let r = run(&inst);
    assert!(r.success);
    assert_eq!(r.assignments.len(), 3);
    assert!(r.conflicts.is_empty());
    assert_eq!(r.score, 100);
    assert_eq!(r.strategy_used, SolveStrategy::ConstraintSearch);
    assert_eq!(r.stats["outcome"], "solved");
    check_invariants(&inst, &r.assignments).unwrap();
}

#[test]
fn exhausted_tree_keeps_deepest_partial_set() {
    let inst = scenario_b();
    let r = run(&inst);
    assert!(!r.success);
    assert_eq!(r.score, 0);
    assert_eq!(r.stats["outcome"], "exhausted");
    assert_eq!(r.assignments.len(), 1);
    assert_eq!(r.assignments[0].course_id.0, "c1");
    assert_eq!(r.conflicts.len(), 1);
    let c = &r.conflicts[0];
    assert_eq!(c.kind, ConflictKind::Time);
    assert_eq!(c.severity, Severity::Critical);
    assert!(c.touches("c2"));
}

#[test]
fn course_without_options_is_excluded_up_front() {
    let inst = scenario_c();
    let r = run(&inst);
    assert!(!r.success);
    assert_eq!(r.assignments.len(), 2);
    assert!(r.assignment_for(&"quantum".into()).is_none());
    assert_eq!(r.conflicts.len(), 1);
    let c = &r.conflicts[0];
    assert_eq!(c.kind, ConflictKind::Structural);
    assert_eq!(c.severity, Severity::Critical);
    assert!(c.touches("quantum"));
    assert_eq!(r.stats["excluded"], 1);
}

#[test]
fn single_option_course_claims_its_slot() {
    // c2 only fits s1, so c1 has to take s2.
    let mut inst = two_course_instance(true);
    inst.instructors.truncate(1);
    inst.instructors.push(instructor("i2", "cs", &["cs"], &inst.slots[..1]));
    inst.courses[1].required_expertise_tags = ["late".to_string()].into();
    inst.instructors[1].expertise_tags.insert("late".into());
    inst.courses[0].required_expertise_tags = ["cs".to_string()].into();
    let r = run(&inst);
    assert!(r.success, "{:?}", r.conflicts);
    check_invariants(&inst, &r.assignments).unwrap();
    let c2 = r.assignment_for(&"c2".into()).unwrap();
    assert_eq!(c2.slot_id.0, "s1");
    let c1 = r.assignment_for(&"c1".into()).unwrap();
    assert_eq!(c1.slot_id.0, "s2");
}

#[test]
fn cancelled_search_returns_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let r = SearchSolver::new().run(&scenario_a(), &GenerationConfig::default(), &token);
    assert!(!r.success);
    assert!(r.assignments.is_empty());
    assert_eq!(r.conflicts[0].kind, ConflictKind::SearchLimit);
    assert!(r.conflicts[0].description.starts_with("run cancelled while placing"));
}

#[tokio::test]
async fn solver_trait_runs_the_search() {
    let req = GenerationRequest {
        instance: scenario_a(),
        config: GenerationConfig::default(),
    };
    let r = SearchSolver::new().solve(req, CancelToken::new()).await.unwrap();
    assert_eq!(r.strategy_used, SolveStrategy::ConstraintSearch);
    assert_eq!(r.stats["method"], "constraint_search");
}

proptest! {
    #[test]
    fn successful_runs_are_complete_and_clash_free(inst in arb_instance()) {
        let r = run(&inst);
        prop_assert!(check_invariants(&inst, &r.assignments).is_ok(), "{:?}", check_invariants(&inst, &r.assignments));
        if r.success {
            prop_assert_eq!(r.assignments.len(), inst.courses.len());
            prop_assert_eq!(r.score, 100);
        } else {
            prop_assert!(!r.conflicts.is_empty());
        }
    }
}
