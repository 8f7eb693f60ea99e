//! Small instance builders for tests across the workspace.

use chrono::NaiveTime;
use std::collections::{BTreeMap, BTreeSet};
use types::{
    Assignment, Course, CourseId, DayOfWeek, Instance, Instructor, InstructorId, Room, RoomId,
    SlotId, Student, StudentId, TimeSlot,
};

pub fn slot(id: &str, day: DayOfWeek, hour: u32) -> TimeSlot {
    TimeSlot {
        id: SlotId::from(id),
        day,
        start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default(),
        end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap_or_default(),
        slot_name: format!("h{hour}"),
    }
}

/// One-hour slots named `"{day}.{hour}"` for every day/hour pair.
pub fn week(days: &[DayOfWeek], hours: &[u32]) -> Vec<TimeSlot> {
    let mut out = Vec::new();
    for &d in days {
        for &h in hours {
            out.push(slot(&format!("{}.{h}", &d.name()[..3]), d, h));
        }
    }
    out
}

pub fn availability(slots: &[TimeSlot]) -> BTreeMap<DayOfWeek, BTreeSet<SlotId>> {
    let mut map: BTreeMap<DayOfWeek, BTreeSet<SlotId>> = BTreeMap::new();
    for s in slots {
        map.entry(s.day).or_default().insert(s.id.clone());
    }
    map
}

pub fn instructor(id: &str, dept: &str, tags: &[&str], available: &[TimeSlot]) -> Instructor {
    Instructor {
        id: InstructorId::from(id),
        name: format!("Instructor {id}"),
        department: dept.into(),
        expertise_tags: tags.iter().map(|t| t.to_string()).collect(),
        availability: availability(available),
        ..Default::default()
    }
}

pub fn course(id: &str, dept: &str, tags: &[&str], enrollment: u32) -> Course {
    Course {
        id: CourseId::from(id),
        name: format!("Course {id}"),
        code: id.to_uppercase(),
        department: dept.into(),
        semester: 1,
        credits: 3,
        max_enrollment: enrollment,
        required_expertise_tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

pub fn room(id: &str, capacity: u32, is_lab: bool) -> Room {
    Room {
        id: RoomId::from(id),
        name: format!("Room {id}"),
        capacity,
        is_lab,
        ..Default::default()
    }
}

pub fn student(id: &str, courses: &[&str]) -> Student {
    Student {
        id: StudentId::from(id),
        enrolled_course_ids: courses.iter().map(|c| CourseId::from(*c)).collect(),
    }
}

pub fn assign(course: &str, instructor: &str, room: &str, slot: &str, inst: &Instance) -> Assignment {
    let day = inst
        .slots
        .iter()
        .find(|s| s.id.0 == slot)
        .map(|s| s.day)
        .unwrap_or_default();
    Assignment {
        course_id: course.into(),
        instructor_id: instructor.into(),
        room_id: room.into(),
        slot_id: slot.into(),
        day,
    }
}

/// Two courses, two instructors qualified for both, one room, two Monday slots.
pub fn two_course_instance(shared_student: bool) -> Instance {
    let slots = vec![slot("s1", DayOfWeek::Mon, 9), slot("s2", DayOfWeek::Mon, 10)];
    let mut inst = Instance {
        courses: vec![course("c1", "cs", &[], 20), course("c2", "cs", &[], 20)],
        instructors: vec![
            instructor("i1", "cs", &["cs"], &slots),
            instructor("i2", "cs", &["cs"], &slots),
        ],
        rooms: vec![room("r1", 50, false)],
        slots,
        ..Default::default()
    };
    if shared_student {
        inst.students.push(student("st1", &["c1", "c2"]));
    }
    inst
}

/// Three unrelated courses, two instructors, one room, slots "morning" and
/// "afternoon" on Monday and Tuesday.
pub fn scenario_a() -> Instance {
    let mut slots = Vec::new();
    for d in [DayOfWeek::Mon, DayOfWeek::Tue] {
        for (h, name) in [(9, "morning"), (14, "afternoon")] {
            let mut s = slot(&format!("{}.{name}", &d.name()[..3]), d, h);
            s.slot_name = name.into();
            slots.push(s);
        }
    }
    Instance {
        courses: vec![
            course("algebra", "math", &["math"], 30),
            course("calculus", "math", &["math"], 30),
            course("physics", "phys", &["phys"], 30),
        ],
        instructors: vec![
            instructor("noether", "math", &["math", "phys"], &slots),
            instructor("curie", "phys", &["phys"], &slots),
        ],
        rooms: vec![room("hall", 60, false)],
        students: vec![
            student("s1", &["algebra"]),
            student("s2", &["calculus"]),
            student("s3", &["physics"]),
        ],
        slots,
        ..Default::default()
    }
}

/// Two courses sharing a student; each instructor can only teach in one
/// common slot.
pub fn scenario_b() -> Instance {
    let only = vec![slot("mon.9", DayOfWeek::Mon, 9)];
    let mut slots = only.clone();
    slots.push(slot("mon.10", DayOfWeek::Mon, 10));
    Instance {
        courses: vec![course("c1", "cs", &[], 20), course("c2", "math", &[], 20)],
        instructors: vec![
            instructor("i1", "cs", &[], &only),
            instructor("i2", "math", &[], &only),
        ],
        rooms: vec![room("r1", 50, false), room("r2", 50, false)],
        students: vec![student("st1", &["c1", "c2"])],
        slots,
        ..Default::default()
    }
}

/// `quantum` needs an expertise tag nobody has; the rest is easy.
pub fn scenario_c() -> Instance {
    let slots = week(&[DayOfWeek::Mon, DayOfWeek::Wed], &[9, 11]);
    Instance {
        courses: vec![
            course("intro", "cs", &["cs"], 20),
            course("quantum", "phys", &["quantum"], 20),
            course("systems", "cs", &["cs"], 20),
        ],
        instructors: vec![
            instructor("i1", "cs", &["cs"], &slots),
            instructor("i2", "phys", &["optics"], &slots),
        ],
        rooms: vec![room("r1", 40, false)],
        slots,
        ..Default::default()
    }
}

/// Checks the properties every successful result must have: no instructor,
/// room or student clash, one placement per course, and every placement
/// structurally valid.
pub fn check_invariants(inst: &Instance, assignments: &[Assignment]) -> Result<(), String> {
    use crate::feasibility::Prep;
    use std::collections::HashSet;

    let prep = Prep::new(inst);
    let mut instructor = HashSet::new();
    let mut room = HashSet::new();
    let mut course = HashSet::new();
    for a in assignments {
        let c = prep
            .candidate_of(a)
            .ok_or_else(|| format!("unknown entity in {a:?}"))?;
        if !prep.structurally_valid(c) {
            return Err(format!("structurally invalid: {a:?}"));
        }
        if !instructor.insert((&a.instructor_id, &a.slot_id)) {
            return Err(format!("instructor clash: {a:?}"));
        }
        if !room.insert((&a.room_id, &a.slot_id)) {
            return Err(format!("room clash: {a:?}"));
        }
        if !course.insert(&a.course_id) {
            return Err(format!("course placed twice: {a:?}"));
        }
    }
    for a in assignments {
        for b in assignments {
            if a.course_id != b.course_id
                && a.slot_id == b.slot_id
                && prep.graph.conflicts(&a.course_id, &b.course_id)
            {
                return Err(format!("student clash: {} / {}", a.course_id, b.course_id));
            }
        }
    }
    Ok(())
}

#[cfg(feature = "testkit")]
pub use arb::arb_instance;

#[cfg(feature = "testkit")]
mod arb {
    use super::*;
    use proptest::prelude::*;

    const TAGS: [&str; 3] = ["a", "b", "c"];
    const SIZES: [u32; 3] = [10, 30, 50];

    fn tags(mask: u8) -> Vec<&'static str> {
        TAGS.iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, t)| *t)
            .collect()
    }

    /// Small random instances over six slots (Mon/Tue, 9..=11).
    pub fn arb_instance() -> impl Strategy<Value = Instance> {
        (
            prop::collection::vec((0u8..4, any::<bool>(), 0usize..3, 1u32..4), 1..6),
            prop::collection::vec((0u8..8, 0u32..64), 1..4),
            prop::collection::vec((any::<bool>(), 0usize..3), 1..3),
            prop::collection::vec(0u8..64, 0..8),
        )
            .prop_map(|(cs, is, rs, ss)| {
                let slots = week(&[DayOfWeek::Mon, DayOfWeek::Tue], &[9, 10, 11]);
                let courses: Vec<Course> = cs
                    .iter()
                    .enumerate()
                    .map(|(i, &(mask, lab, size, semester))| {
                        let mut c = course(&format!("c{i}"), "dept", &tags(mask), SIZES[size]);
                        c.requires_lab = lab;
                        c.semester = semester;
                        c
                    })
                    .collect();
                let instructors = is
                    .iter()
                    .enumerate()
                    .map(|(i, &(mask, avail))| {
                        let free: Vec<TimeSlot> = slots
                            .iter()
                            .enumerate()
                            .filter(|(k, _)| avail & (1 << k) != 0)
                            .map(|(_, s)| s.clone())
                            .collect();
                        instructor(&format!("i{i}"), "dept", &tags(mask), &free)
                    })
                    .collect();
                let rooms = rs
                    .iter()
                    .enumerate()
                    .map(|(i, &(lab, size))| room(&format!("r{i}"), SIZES[size], lab))
                    .collect();
                let students = ss
                    .iter()
                    .enumerate()
                    .map(|(i, &mask)| {
                        let ids: Vec<String> = (0..courses.len())
                            .filter(|k| mask & (1 << k) != 0)
                            .map(|k| format!("c{k}"))
                            .collect();
                        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                        student(&format!("st{i}"), &refs)
                    })
                    .collect();
                Instance {
                    courses,
                    instructors,
                    rooms,
                    slots,
                    students,
                    ..Default::default()
                }
            })
    }
}
