//! Ranked rescheduling options for the assignments a disruption hits.
//!
//! Each option kind is built independently over the untouched part of the
//! schedule. An option is only offered when every hit assignment can be
//! re-placed without a clash and without using a disrupted resource.

use sched_core::{Candidate, Clash, Occupancy, Prep};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use types::{
    Assignment, ChangeKind, DisruptionEvent, DisruptionKind, DisruptionSeverity, ImpactAssessment,
    Instance, OptionId, OptionKind, ReschedulingOption, ResourceKind, ScheduleChange,
};
use uuid::Uuid;

const KINDS: [OptionKind; 4] = [
    OptionKind::Substitute,
    OptionKind::SameDayMove,
    OptionKind::Postpone,
    OptionKind::Split,
];

fn base_confidence(kind: OptionKind) -> f64 {
    match kind {
        OptionKind::Substitute => 0.85,
        OptionKind::SameDayMove => 0.75,
        OptionKind::Postpone => 0.6,
        OptionKind::Split => 0.45,
    }
}

fn minutes_per_course(kind: OptionKind) -> u32 {
    match kind {
        OptionKind::Substitute => 15,
        OptionKind::SameDayMove => 20,
        OptionKind::Postpone => 30,
        OptionKind::Split => 45,
    }
}

pub fn kind_label(kind: DisruptionKind) -> &'static str {
    match kind {
        DisruptionKind::InstructorAbsence => "instructor absence",
        DisruptionKind::RoomUnavailable => "room unavailable",
        DisruptionKind::EquipmentFailure => "equipment failure",
        DisruptionKind::Closure => "closure",
        DisruptionKind::Weather => "weather",
        DisruptionKind::Maintenance => "maintenance",
        DisruptionKind::ConflictingEvent => "conflicting event",
        DisruptionKind::StudentEmergency => "student emergency",
    }
}

struct Ctx<'a> {
    prep: Prep<'a>,
    event: &'a DisruptionEvent,
}

impl Ctx<'_> {
    fn instructor_hit(&self, i: usize) -> bool {
        self.event
            .hits(ResourceKind::Instructor, &self.prep.inst.instructors[i].id.0)
    }

    fn room_hit(&self, r: usize) -> bool {
        self.event.hits(ResourceKind::Room, &self.prep.inst.rooms[r].id.0)
    }

    /// The candidate uses a disrupted resource on a disrupted day.
    fn blocked(&self, c: Candidate) -> bool {
        let inst = self.prep.inst;
        self.event.covers_day(inst.slots[c.slot].day)
            && (self.instructor_hit(c.instructor)
                || self.room_hit(c.room)
                || self
                    .event
                    .hits(ResourceKind::Course, &inst.courses[c.course].id.0))
    }

    /// Other sessions of the same course do not count as a clash.
    fn usable(&self, occ: &Occupancy, c: Candidate) -> bool {
        !self.blocked(c)
            && occ
                .clashes(&self.prep, c)
                .iter()
                .all(|k| *k == Clash::Course)
    }

    fn day(&self, c: Candidate) -> types::DayOfWeek {
        self.prep.inst.slots[c.slot].day
    }

    fn ordered(&self, o: Candidate, keep: impl Fn(&Candidate) -> bool, occ: &Occupancy) -> Vec<Candidate> {
        let slots = &self.prep.inst.slots;
        let mut v: Vec<Candidate> = self
            .prep
            .options_for(o.course)
            .into_iter()
            .filter(|c| keep(c) && self.usable(occ, *c))
            .collect();
        v.sort_by_key(|c| {
            (
                slots[c.slot].day,
                slots[c.slot].start_time,
                c.instructor != o.instructor,
                c.room != o.room,
                c.slot,
            )
        });
        v
    }

    fn substitute(&self, occ: &Occupancy, o: Candidate) -> Option<Candidate> {
        let (ih, rh) = (self.instructor_hit(o.instructor), self.room_hit(o.room));
        if !ih && !rh {
            return None;
        }
        let inst = self.prep.inst;
        let dept = &inst.courses[o.course].department;
        self.prep
            .options_for(o.course)
            .into_iter()
            .filter(|c| {
                c.slot == o.slot
                    && (c.instructor == o.instructor || ih)
                    && (c.room == o.room || rh)
                    && self.usable(occ, *c)
            })
            .min_by_key(|c| (inst.instructors[c.instructor].department != *dept, c.instructor, c.room))
    }

    fn same_day(&self, occ: &Occupancy, o: Candidate) -> Option<Candidate> {
        let day = self.day(o);
        let slots = &self.prep.inst.slots;
        self.ordered(o, |c| c.slot != o.slot && self.day(*c) == day, occ)
            .into_iter()
            .min_by_key(|c| (c.instructor != o.instructor, c.room != o.room, slots[c.slot].start_time))
    }

    fn postpone(&self, occ: &Occupancy, o: Candidate) -> Option<Candidate> {
        let day = self.day(o);
        self.ordered(o, |c| self.day(*c) > day, occ).into_iter().next()
    }

    fn split(&self, occ: &Occupancy, o: Candidate) -> Option<(Candidate, Candidate)> {
        let day = self.day(o);
        let opts = self.ordered(o, |c| c.slot != o.slot && self.day(*c) >= day, occ);
        let first = *opts.first()?;
        let mut next = occ.clone();
        next.place(&self.prep, first);
        let second = opts
            .into_iter()
            .find(|c| c.slot != first.slot && self.usable(&next, *c))?;
        Some((first, second))
    }
}

/// Assignments of `schedule` that `event` makes impossible.
pub fn affected_assignments(event: &DisruptionEvent, inst: &Instance, schedule: &[Assignment]) -> Vec<Assignment> {
    let prep = Prep::new(inst);
    let ctx = Ctx { prep, event };
    schedule
        .iter()
        .filter(|a| ctx.prep.candidate_of(a).is_some_and(|c| ctx.blocked(c)))
        .cloned()
        .collect()
}

/// Up to one option per kind, highest confidence first. Empty when the
/// event touches nothing in `schedule` or nothing can be re-placed.
pub fn generate_options(
    event: &DisruptionEvent,
    inst: &Instance,
    schedule: &[Assignment],
) -> Vec<ReschedulingOption> {
    let ctx = Ctx {
        prep: Prep::new(inst),
        event,
    };

    let mut base = Occupancy::new();
    let mut hit: Vec<(&Assignment, Candidate)> = Vec::new();
    for a in schedule {
        let Some(c) = ctx.prep.candidate_of(a) else {
            warn!(course = %a.course_id, "schedule entry references an unknown entity");
            continue;
        };
        if ctx.blocked(c) {
            hit.push((a, c));
        } else {
            base.place(&ctx.prep, c);
        }
    }
    if hit.is_empty() {
        debug!(event = %event.id, "disruption touches no assignment");
        return Vec::new();
    }

    let mut out: Vec<ReschedulingOption> = KINDS
        .iter()
        .filter_map(|&kind| build(&ctx, kind, &hit, &base))
        .collect();
    out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    debug!(
        event = %event.id,
        hit = hit.len(),
        options = out.len(),
        "rescheduling options generated"
    );
    out
}

fn build(
    ctx: &Ctx<'_>,
    kind: OptionKind,
    hit: &[(&Assignment, Candidate)],
    base: &Occupancy,
) -> Option<ReschedulingOption> {
    let prep = &ctx.prep;
    let inst = prep.inst;
    let reason = if ctx.event.description.is_empty() {
        kind_label(ctx.event.kind).to_string()
    } else {
        format!("{}: {}", kind_label(ctx.event.kind), ctx.event.description)
    };

    let mut occ = base.clone();
    let mut changes: Vec<ScheduleChange> = Vec::new();
    for &(orig, o) in hit {
        let students = inst.students_in(&orig.course_id).count() as u32;
        let change = |kind: ChangeKind, original: Option<&Assignment>, new: Candidate| {
            let new = prep.assignment(new);
            let instructors = if original.is_some_and(|a| a.instructor_id != new.instructor_id) {
                2
            } else {
                1
            };
            ScheduleChange {
                kind,
                original: original.cloned(),
                new: Some(new),
                reason: reason.clone(),
                affected_students: students,
                affected_instructors: instructors,
            }
        };

        match kind {
            OptionKind::Split => {
                let (a, b) = ctx.split(&occ, o)?;
                occ.place(prep, a);
                occ.place(prep, b);
                changes.push(change(ChangeKind::Split, Some(orig), a));
                changes.push(change(ChangeKind::Split, None, b));
            }
            _ => {
                let (n, ck) = match kind {
                    OptionKind::Substitute => (ctx.substitute(&occ, o)?, ChangeKind::Substitute),
                    OptionKind::SameDayMove => (ctx.same_day(&occ, o)?, ChangeKind::Move),
                    _ => (ctx.postpone(&occ, o)?, ChangeKind::Move),
                };
                occ.place(prep, n);
                changes.push(change(ck, Some(orig), n));
            }
        }
    }

    let impact = assess(prep, kind, &changes);
    let penalty = 0.05 * (impact.courses_affected.saturating_sub(1)) as f64
        + 0.1 * (impact.students_affected as f64 / 100.0).min(1.0);
    let confidence = (base_confidence(kind) - penalty).clamp(0.0, 1.0);

    Some(ReschedulingOption {
        id: OptionId(Uuid::new_v4().to_string()),
        kind,
        title: title(kind).to_string(),
        description: changes.iter().map(summary).collect::<Vec<_>>().join("; "),
        estimated_resolution_minutes: minutes_per_course(kind) * impact.courses_affected.max(1),
        impact,
        changes,
        confidence,
    })
}

fn title(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::Substitute => "Substitute instructor or room",
        OptionKind::SameDayMove => "Move within the same day",
        OptionKind::Postpone => "Postpone to the next free slot",
        OptionKind::Split => "Split into two sessions",
    }
}

fn summary(c: &ScheduleChange) -> String {
    let at = |a: &Assignment| format!("{} in {} at {}", a.instructor_id, a.room_id, a.slot_id);
    match (&c.original, &c.new) {
        (Some(o), Some(n)) => format!("{}: {} -> {}", o.course_id, at(o), at(n)),
        (None, Some(n)) => format!("{}: extra session, {}", n.course_id, at(n)),
        (Some(o), None) => format!("{}: cancelled ({})", o.course_id, at(o)),
        (None, None) => String::new(),
    }
}

fn assess(prep: &Prep<'_>, kind: OptionKind, changes: &[ScheduleChange]) -> ImpactAssessment {
    let inst = prep.inst;
    let mut courses = BTreeSet::new();
    let mut instructors = BTreeSet::new();
    let mut rooms = BTreeSet::new();
    let mut hours = 0.0;
    for c in changes {
        for a in c.original.iter().chain(c.new.iter()) {
            courses.insert(&a.course_id);
            instructors.insert(&a.instructor_id);
            rooms.insert(&a.room_id);
        }
        if let Some(n) = &c.new {
            let minutes = inst.slot(&n.slot_id).map_or(0, |s| s.duration_minutes()) as f64;
            hours += match kind {
                OptionKind::Substitute => 0.5,
                OptionKind::Split => minutes / 120.0,
                _ => minutes / 60.0,
            };
        }
    }
    let students: BTreeSet<_> = inst
        .students
        .iter()
        .filter(|s| s.enrolled_course_ids.iter().any(|c| courses.contains(&c)))
        .map(|s| &s.id)
        .collect();
    let students_affected = students.len() as u32;

    ImpactAssessment {
        students_affected,
        instructors_affected: instructors.len() as u32,
        rooms_affected: rooms.len() as u32,
        courses_affected: courses.len() as u32,
        severity: match students_affected {
            0..=9 => DisruptionSeverity::Low,
            10..=49 => DisruptionSeverity::Medium,
            50..=99 => DisruptionSeverity::High,
            _ => DisruptionSeverity::Critical,
        },
        estimated_disruption_hours: hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::new_event;
    use sched_core::testkit::*;
    use types::{AffectedResource, DayOfWeek};

    fn absence(id: &str, days: &[DayOfWeek]) -> DisruptionEvent {
        new_event(
            DisruptionKind::InstructorAbsence,
            DisruptionSeverity::High,
            vec![AffectedResource::direct(ResourceKind::Instructor, id)],
            days.iter().copied(),
        )
    }

    #[test]
    fn untouched_schedule_yields_nothing() {
        let inst = scenario_a();
        let schedule = vec![assign("algebra", "noether", "hall", "mon.morning", &inst)];
        assert!(generate_options(&absence("curie", &[]), &inst, &schedule).is_empty());
    }

    #[test]
    fn event_on_another_day_does_not_hit() {
        let inst = scenario_a();
        let schedule = vec![assign("physics", "curie", "hall", "mon.morning", &inst)];
        let ev = absence("curie", &[DayOfWeek::Tue]);
        assert!(affected_assignments(&ev, &inst, &schedule).is_empty());
        let ev = absence("curie", &[DayOfWeek::Mon]);
        assert_eq!(affected_assignments(&ev, &inst, &schedule).len(), 1);
    }

    #[test]
    fn all_four_kinds_sorted_by_confidence() {
        let inst = scenario_a();
        let schedule = vec![assign("physics", "curie", "hall", "mon.morning", &inst)];
        let opts = generate_options(&absence("curie", &[DayOfWeek::Mon]), &inst, &schedule);
        let kinds: Vec<OptionKind> = opts.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OptionKind::Substitute,
                OptionKind::SameDayMove,
                OptionKind::Postpone,
                OptionKind::Split
            ]
        );
        assert!(opts.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let sub = &opts[0].changes[0];
        assert_eq!(sub.kind, ChangeKind::Substitute);
        let new = sub.new.as_ref().unwrap();
        assert_eq!(new.instructor_id.0, "noether");
        assert_eq!(new.slot_id.0, "mon.morning");

        // Curie is out all Monday, so the same-day move needs noether too.
        let moved = opts[1].changes[0].new.as_ref().unwrap();
        assert_eq!(moved.slot_id.0, "mon.afternoon");
        assert_eq!(moved.instructor_id.0, "noether");

        let later = opts[2].changes[0].new.as_ref().unwrap();
        assert_eq!(later.slot_id.0, "tue.morning");
        assert_eq!(later.instructor_id.0, "curie");

        assert_eq!(opts[3].changes.len(), 2);
        assert!(opts[3].changes[1].original.is_none());
    }

    #[test]
    fn options_avoid_occupied_slots() {
        let inst = scenario_a();
        let schedule = vec![
            assign("physics", "curie", "hall", "mon.morning", &inst),
            assign("algebra", "noether", "hall", "mon.afternoon", &inst),
        ];
        let opts = generate_options(&absence("curie", &[DayOfWeek::Mon]), &inst, &schedule);
        assert!(opts.iter().all(|o| o.kind != OptionKind::SameDayMove));
        for o in &opts {
            for c in &o.changes {
                assert_ne!(c.new.as_ref().unwrap().slot_id.0, "mon.afternoon");
            }
        }
    }

    #[test]
    fn impact_counts_students_once() {
        let mut inst = scenario_a();
        inst.students.push(student("s9", &["physics"]));
        let schedule = vec![assign("physics", "curie", "hall", "mon.morning", &inst)];
        let opts = generate_options(&absence("curie", &[]), &inst, &schedule);
        let sub = opts.iter().find(|o| o.kind == OptionKind::Substitute).unwrap();
        assert_eq!(sub.impact.students_affected, 2);
        assert_eq!(sub.impact.courses_affected, 1);
        assert_eq!(sub.impact.instructors_affected, 2);
        assert_eq!(sub.impact.severity, DisruptionSeverity::Low);
        assert!((0.0..=1.0).contains(&sub.confidence));
    }
}
