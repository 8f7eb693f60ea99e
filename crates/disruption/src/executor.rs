//! Applies rescheduling options to a schedule and undoes them.

use sched_core::audit::audit_sessions;
use sched_core::Prep;
use std::time::Instant;
use tracing::{info, warn};
use types::{
    Assignment, ConflictInfo, EventId, ExecutionOutcome, Instance, ReschedulingOption, RollbackPlan,
    ScheduleChange,
};

use crate::{DisruptionDetector, DisruptionError};

/// Replacements happen in place and additions go to the end, so applying the
/// inverted changes in reverse order restores the exact input.
fn apply(schedule: &mut Vec<Assignment>, change: &ScheduleChange) -> Result<(), String> {
    match (&change.original, &change.new) {
        (Some(orig), new) => {
            let pos = schedule
                .iter()
                .rposition(|a| a == orig)
                .ok_or_else(|| format!("{} at {} is not in the schedule", orig.course_id, orig.slot_id))?;
            match new {
                Some(n) => schedule[pos] = n.clone(),
                None => {
                    schedule.remove(pos);
                }
            }
            Ok(())
        }
        (None, Some(n)) => {
            schedule.push(n.clone());
            Ok(())
        }
        (None, None) => Err("change has neither an original nor a new assignment".into()),
    }
}

fn apply_all(
    changes: &[ScheduleChange],
    inst: &Instance,
    schedule: &[Assignment],
    what: &str,
) -> ExecutionOutcome {
    let started = Instant::now();
    let mut working = schedule.to_vec();

    for (i, change) in changes.iter().enumerate() {
        if let Err(e) = apply(&mut working, change) {
            warn!(step = i, error = %e, "{what} aborted");
            return ExecutionOutcome {
                success: false,
                schedule: schedule.to_vec(),
                rollback: RollbackPlan::default(),
                conflicts: Vec::new(),
                elapsed_ms: started.elapsed().as_millis() as u64,
                message: format!("{what} aborted at change {i}: {e}"),
            };
        }
    }

    let rollback = RollbackPlan {
        changes: changes.iter().rev().map(ScheduleChange::inverted).collect(),
    };
    let prep = Prep::new(inst);
    let before = audit_sessions(&prep, schedule);
    let conflicts: Vec<ConflictInfo> = audit_sessions(&prep, &working)
        .into_iter()
        .filter(|c| !before.contains(c))
        .collect();
    let success = conflicts.is_empty();
    let message = if success {
        format!("{what} applied {} change(s)", changes.len())
    } else {
        format!("{what} introduced {} conflict(s)", conflicts.len())
    };
    info!(changes = changes.len(), conflicts = conflicts.len(), "{what} finished");

    ExecutionOutcome {
        success,
        schedule: working,
        rollback,
        conflicts,
        elapsed_ms: started.elapsed().as_millis() as u64,
        message,
    }
}

/// Applies `option` to a copy of `schedule`. The rollback plan is filled
/// whenever the changes could be applied, even if validation then fails; a
/// change that cannot be applied leaves the schedule untouched and the plan
/// empty.
pub fn execute(option: &ReschedulingOption, inst: &Instance, schedule: &[Assignment]) -> ExecutionOutcome {
    apply_all(&option.changes, inst, schedule, "execution")
}

pub fn rollback(plan: &RollbackPlan, inst: &Instance, schedule: &[Assignment]) -> ExecutionOutcome {
    apply_all(&plan.changes, inst, schedule, "rollback")
}

/// Executes `option` for an active event and resolves the event on success.
pub fn execute_for_event(
    detector: &DisruptionDetector,
    event: &EventId,
    option: &ReschedulingOption,
    inst: &Instance,
    schedule: &[Assignment],
) -> Result<ExecutionOutcome, DisruptionError> {
    let ev = detector
        .get(event)
        .ok_or_else(|| DisruptionError::UnknownEvent(event.clone()))?;
    if ev.status != types::EventStatus::Active {
        return Err(DisruptionError::NotActive(event.clone(), ev.status));
    }
    let outcome = execute(option, inst, schedule);
    if outcome.success {
        detector.resolve(event)?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::testkit::*;
    use types::{ChangeKind, OptionId, OptionKind};

    fn option(changes: Vec<ScheduleChange>) -> ReschedulingOption {
        ReschedulingOption {
            id: OptionId::from("o1"),
            kind: OptionKind::SameDayMove,
            title: String::new(),
            description: String::new(),
            impact: types::ImpactAssessment {
                students_affected: 0,
                instructors_affected: 0,
                rooms_affected: 0,
                courses_affected: 0,
                severity: types::DisruptionSeverity::Low,
                estimated_disruption_hours: 0.0,
            },
            changes,
            confidence: 0.5,
            estimated_resolution_minutes: 0,
        }
    }

    fn change(original: Option<Assignment>, new: Option<Assignment>) -> ScheduleChange {
        ScheduleChange {
            kind: ChangeKind::Move,
            original,
            new,
            reason: "test".into(),
            affected_students: 0,
            affected_instructors: 1,
        }
    }

    #[test]
    fn move_then_rollback_restores_input() {
        let inst = scenario_a();
        let schedule = vec![
            assign("algebra", "noether", "hall", "mon.morning", &inst),
            assign("physics", "curie", "hall", "tue.morning", &inst),
        ];
        let moved = assign("algebra", "noether", "hall", "mon.afternoon", &inst);
        let out = execute(&option(vec![change(Some(schedule[0].clone()), Some(moved.clone()))]), &inst, &schedule);
        assert!(out.success, "{}", out.message);
        assert_eq!(out.schedule[0], moved);
        assert_eq!(out.rollback.changes.len(), 1);

        let back = rollback(&out.rollback, &inst, &out.schedule);
        assert!(back.success);
        assert_eq!(back.schedule, schedule);
    }

    #[test]
    fn missing_original_aborts_with_empty_plan() {
        let inst = scenario_a();
        let schedule = vec![assign("algebra", "noether", "hall", "mon.morning", &inst)];
        let ghost = assign("physics", "curie", "hall", "tue.morning", &inst);
        let out = execute(&option(vec![change(Some(ghost), None)]), &inst, &schedule);
        assert!(!out.success);
        assert!(out.rollback.is_empty());
        assert_eq!(out.schedule, schedule);
        assert!(out.message.contains("not in the schedule"));
    }

    #[test]
    fn clash_fails_validation_but_keeps_rollback() {
        let inst = scenario_a();
        let schedule = vec![
            assign("algebra", "noether", "hall", "mon.morning", &inst),
            assign("physics", "curie", "hall", "tue.morning", &inst),
        ];
        let onto = assign("physics", "curie", "hall", "mon.morning", &inst);
        let out = execute(&option(vec![change(Some(schedule[1].clone()), Some(onto))]), &inst, &schedule);
        assert!(!out.success);
        assert!(!out.conflicts.is_empty());
        assert_eq!(out.rollback.changes.len(), 1);
        assert_eq!(rollback(&out.rollback, &inst, &out.schedule).schedule, schedule);
    }

    #[test]
    fn existing_conflicts_are_not_blamed_on_the_option() {
        let inst = scenario_a();
        let schedule = vec![
            assign("algebra", "noether", "hall", "mon.morning", &inst),
            assign("calculus", "noether", "hall", "mon.morning", &inst),
        ];
        let out = execute(&option(Vec::new()), &inst, &schedule);
        assert!(out.success);
        assert!(out.conflicts.is_empty());
    }
}
