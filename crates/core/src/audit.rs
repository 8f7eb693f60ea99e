//! Independent re-validation of a finished assignment set.
//!
//! Solvers are expected to produce clash-free sets by construction; this pass
//! does not trust them and re-derives every clash from scratch.

use std::collections::HashMap;
use tracing::warn;
use types::{Assignment, ConflictInfo, ConflictKind, Severity};

use crate::feasibility::{Candidate, Prep};
use crate::occupancy::{diagnose, Occupancy};

pub fn audit(prep: &Prep<'_>, assignments: &[Assignment]) -> Vec<ConflictInfo> {
    audit_with(prep, assignments, false)
}

/// Like [`audit`], but a course may hold several sessions, as it does after a
/// split.
pub fn audit_sessions(prep: &Prep<'_>, assignments: &[Assignment]) -> Vec<ConflictInfo> {
    audit_with(prep, assignments, true)
}

fn audit_with(prep: &Prep<'_>, assignments: &[Assignment], multi_session: bool) -> Vec<ConflictInfo> {
    let inst = prep.inst;
    let mut out: Vec<ConflictInfo> = Vec::new();

    let mut by_course: HashMap<usize, &Assignment> = HashMap::new();
    let mut by_instructor: HashMap<(usize, usize), &Assignment> = HashMap::new();
    let mut by_room: HashMap<(usize, usize), &Assignment> = HashMap::new();
    let mut by_slot: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut load: HashMap<usize, u64> = HashMap::new();

    for a in assignments {
        let Some(c) = prep.candidate_of(a) else {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Structural,
                    Severity::Critical,
                    format!("assignment for course {} references an unknown entity", a.course_id),
                )
                .affecting(&a.course_id),
            );
            continue;
        };

        if inst.slots[c.slot].day != a.day {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Time,
                    Severity::Major,
                    format!("course {} day does not match slot {}", a.course_id, a.slot_id),
                )
                .affecting(&a.course_id),
            );
        }

        if !prep.structurally_valid(c) {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Structural,
                    Severity::Critical,
                    format!(
                        "course {} with instructor {} in room {} at {} is not a valid combination",
                        a.course_id, a.instructor_id, a.room_id, a.slot_id
                    ),
                )
                .affecting(&a.course_id)
                .affecting(&a.instructor_id)
                .affecting(&a.room_id),
            );
        }

        if let Some(prev) = by_course.insert(c.course, a).filter(|_| !multi_session) {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Time,
                    Severity::Major,
                    format!(
                        "course {} is scheduled at both {} and {}",
                        a.course_id, prev.slot_id, a.slot_id
                    ),
                )
                .affecting(&a.course_id),
            );
        }

        if let Some(prev) = by_instructor.insert((c.instructor, c.slot), a) {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Instructor,
                    Severity::Critical,
                    format!(
                        "instructor {} teaches {} and {} at {}",
                        a.instructor_id, prev.course_id, a.course_id, a.slot_id
                    ),
                )
                .affecting(&a.instructor_id)
                .affecting(&prev.course_id)
                .affecting(&a.course_id)
                .suggest("move one of the courses to another slot or assign another instructor"),
            );
        }

        if let Some(prev) = by_room.insert((c.room, c.slot), a) {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Room,
                    Severity::Critical,
                    format!(
                        "room {} hosts {} and {} at {}",
                        a.room_id, prev.course_id, a.course_id, a.slot_id
                    ),
                )
                .affecting(&a.room_id)
                .affecting(&prev.course_id)
                .affecting(&a.course_id)
                .suggest("move one of the courses to a free room"),
            );
        }

        let here = by_slot.entry(c.slot).or_default();
        for &other in here.iter() {
            if prep.neighbors[c.course].contains(&other) {
                let other_id = &inst.courses[other].id;
                let shared = inst
                    .students
                    .iter()
                    .filter(|s| {
                        s.enrolled_course_ids.contains(&a.course_id)
                            && s.enrolled_course_ids.contains(other_id)
                    })
                    .count();
                out.push(
                    ConflictInfo::new(
                        ConflictKind::Time,
                        Severity::Critical,
                        format!(
                            "{shared} student(s) take both {} and {} at {}",
                            other_id, a.course_id, a.slot_id
                        ),
                    )
                    .affecting(other_id)
                    .affecting(&a.course_id),
                );
            }
        }
        here.push(c.course);

        *load.entry(c.instructor).or_default() += u64::from(prep.slot_minutes[c.slot]);
    }

    for (ii, minutes) in load {
        let ins = &inst.instructors[ii];
        if ins.weekly_cap_minutes().is_some_and(|cap| minutes > cap) {
            out.push(
                ConflictInfo::new(
                    ConflictKind::Instructor,
                    Severity::Major,
                    format!(
                        "instructor {} is booked for {} minutes, limit is {} hours",
                        ins.id, minutes, ins.max_hours_per_week
                    ),
                )
                .affecting(&ins.id),
            );
        }
    }

    if !out.is_empty() {
        warn!(conflicts = out.len(), "audit found residual conflicts");
    }
    out
}

/// Critical conflict for a course no strategy could place.
pub fn unplaced(prep: &Prep<'_>, occ: &Occupancy, course: usize, options: &[Candidate]) -> ConflictInfo {
    let c = &prep.inst.courses[course];
    let kind = diagnose(prep, occ, options);
    let (description, suggestion) = match kind {
        ConflictKind::Structural => (
            format!(
                "assignment failed for {}: no instructor, room and slot combination satisfies its requirements",
                c.id
            ),
            "add an instructor with the required expertise, a suitable room, or more availability",
        ),
        ConflictKind::Instructor => (
            format!("assignment failed for {}: every eligible instructor is busy", c.id),
            "extend instructor availability or add a qualified instructor",
        ),
        ConflictKind::Room => (
            format!("assignment failed for {}: no suitable room is free", c.id),
            "free a room or add capacity",
        ),
        _ => (
            format!(
                "assignment failed for {}: every slot clashes with a course sharing students",
                c.id
            ),
            "add a time slot or split the shared cohort",
        ),
    };
    ConflictInfo::new(kind, Severity::Critical, description)
        .affecting(&c.id)
        .suggest(suggestion)
}
