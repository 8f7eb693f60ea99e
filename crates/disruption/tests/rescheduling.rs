use disruption::{
    execute, execute_for_event, generate_options, new_event, rollback, DisruptionDetector,
    DisruptionError, NotificationPlan,
};
use proptest::prelude::*;
use sched_core::testkit::*;
use sched_core::{CancelToken, GenerationConfig};
use solver_heur::GreedySolver;
use types::{
    AffectedResource, Assignment, ChangeKind, DayOfWeek, DisruptionKind, DisruptionSeverity,
    EventStatus, Instance, OptionKind, ResourceKind,
};

fn absence(instructor: &str) -> types::DisruptionEvent {
    new_event(
        DisruptionKind::InstructorAbsence,
        DisruptionSeverity::High,
        vec![AffectedResource::direct(ResourceKind::Instructor, instructor)],
        [],
    )
}

fn greedy_schedule(inst: &Instance) -> Vec<Assignment> {
    GreedySolver::new()
        .run(inst, &GenerationConfig::default(), &CancelToken::new())
        .assignments
}

#[test]
fn absent_instructor_with_one_session_gets_an_option() {
    let inst = scenario_a();
    let schedule = greedy_schedule(&inst);
    let taught: Vec<_> = schedule.iter().filter(|a| a.instructor_id.0 == "curie").collect();
    assert_eq!(taught.len(), 1);

    let opts = generate_options(&absence("curie"), &inst, &schedule);
    assert!(!opts.is_empty());
    for o in &opts {
        assert!((0.0..=1.0).contains(&o.confidence));
        assert!(o.changes.iter().all(|c| c.new.is_some()));
    }
    let useful = opts.iter().any(|o| {
        o.changes.iter().any(|c| {
            let (Some(orig), Some(new)) = (&c.original, &c.new) else {
                return false;
            };
            (c.kind == ChangeKind::Substitute && new.instructor_id != orig.instructor_id)
                || new.slot_id != orig.slot_id
        })
    });
    assert!(useful);
}

#[test]
fn executing_for_an_event_resolves_it() {
    let inst = scenario_a();
    let schedule = greedy_schedule(&inst);
    let det = DisruptionDetector::new();
    let ev = det.report(absence("curie")).unwrap();

    let opts = generate_options(&ev, &inst, &schedule);
    let out = execute_for_event(&det, &ev.id, &opts[0], &inst, &schedule).unwrap();
    assert!(out.success, "{}", out.message);
    assert!(out.schedule.iter().all(|a| a.instructor_id.0 != "curie"));
    assert_eq!(det.get(&ev.id).unwrap().status, EventStatus::Resolved);
    assert!(det.active().is_empty());

    let again = execute_for_event(&det, &ev.id, &opts[0], &inst, &schedule);
    assert!(matches!(again, Err(DisruptionError::NotActive(_, EventStatus::Resolved))));

    let plan = NotificationPlan::for_option(&opts[0], &inst);
    assert!(plan.instructor_ids.contains("curie"));
}

#[test]
fn split_adds_a_second_session_and_rolls_back() {
    let inst = scenario_a();
    // hall is taken on Tuesday morning, so curie's Monday class can be split
    // into Monday afternoon and Tuesday afternoon.
    let schedule = vec![
        assign("physics", "curie", "hall", "mon.morning", &inst),
        assign("algebra", "noether", "hall", "tue.morning", &inst),
    ];
    let monday_absence = new_event(
        DisruptionKind::InstructorAbsence,
        DisruptionSeverity::High,
        vec![AffectedResource::direct(ResourceKind::Instructor, "curie")],
        [DayOfWeek::Mon],
    );
    let opts = generate_options(&monday_absence, &inst, &schedule);
    let split = opts
        .iter()
        .find(|o| o.kind == OptionKind::Split)
        .expect("split option for a Monday class");
    assert_eq!(split.changes.len(), 2);
    assert!(split.changes[1].original.is_none());

    let out = execute(split, &inst, &schedule);
    assert!(out.success, "{:?}", out.conflicts);
    assert_eq!(out.schedule.len(), schedule.len() + 1);
    let sessions: Vec<_> = out
        .schedule
        .iter()
        .filter(|a| a.course_id.0 == "physics")
        .map(|a| (a.slot_id.0.as_str(), a.instructor_id.0.as_str()))
        .collect();
    assert_eq!(sessions, vec![("mon.afternoon", "noether"), ("tue.afternoon", "curie")]);

    let back = rollback(&out.rollback, &inst, &out.schedule);
    assert!(back.success);
    assert_eq!(back.schedule, schedule);
}

proptest! {
    #[test]
    fn execute_then_rollback_is_identity(inst in arb_instance(), pick in any::<prop::sample::Index>()) {
        let schedule = greedy_schedule(&inst);
        prop_assume!(!schedule.is_empty());
        let target = &schedule[pick.index(schedule.len())];
        let ev = absence(&target.instructor_id.0);

        for o in generate_options(&ev, &inst, &schedule) {
            let out = execute(&o, &inst, &schedule);
            prop_assert!(out.success, "{:?}: {:?}", o.kind, out.conflicts);
            let back = rollback(&out.rollback, &inst, &out.schedule);
            prop_assert_eq!(&back.schedule, &schedule);
            prop_assert!(back.rollback.changes.len() == o.changes.len());
        }
    }
}
