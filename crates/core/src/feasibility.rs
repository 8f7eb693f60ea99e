use std::collections::{HashMap, HashSet};
use types::{
    Assignment, ConstraintPayload, Course, DayOfWeek, DayPeriod, EntityType, Instance, Instructor,
    Polarity, Room, TimeSlot,
};

use crate::graph::ConflictGraph;

/// Indices into `Instance::{courses, instructors, rooms, slots}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub course: usize,
    pub instructor: usize,
    pub room: usize,
    pub slot: usize,
}

#[derive(Clone, Debug, Default)]
struct SlotRule {
    avoid_days: HashSet<DayOfWeek>,
    only_days: HashSet<DayOfWeek>,
    avoid_periods: HashSet<DayPeriod>,
    only_periods: HashSet<DayPeriod>,
}

impl SlotRule {
    fn allows(&self, slot: &TimeSlot) -> bool {
        let period = slot.period();
        !self.avoid_days.contains(&slot.day)
            && (self.only_days.is_empty() || self.only_days.contains(&slot.day))
            && !self.avoid_periods.contains(&period)
            && (self.only_periods.is_empty() || self.only_periods.contains(&period))
    }
}

#[derive(Clone, Debug, Default)]
struct RoomNeeds {
    lab: Option<bool>,
    equipment: Vec<String>,
}

impl RoomNeeds {
    fn met_by(&self, room: &Room) -> bool {
        self.lab.map_or(true, |want| room.is_lab == want)
            && self.equipment.iter().all(|e| room.equipment.contains(e))
    }
}

/// Hard constraints that narrow structural validity beyond the base rules.
#[derive(Clone, Debug, Default)]
pub struct HardRules {
    slot_rules: HashMap<(EntityType, String), SlotRule>,
    room_needs: HashMap<(EntityType, String), RoomNeeds>,
}

impl HardRules {
    pub fn from_instance(inst: &Instance) -> Self {
        let mut rules = HardRules::default();
        for c in inst.constraints.iter().filter(|c| c.is_hard()) {
            let key = (c.scope.entity, c.scope.id.clone());
            match &c.payload {
                ConstraintPayload::Day { day, polarity } => {
                    let r = rules.slot_rules.entry(key).or_default();
                    match polarity {
                        Polarity::Avoid => r.avoid_days.insert(*day),
                        Polarity::Prefer => r.only_days.insert(*day),
                    };
                }
                ConstraintPayload::TimeOfDay { period, polarity } => {
                    let r = rules.slot_rules.entry(key).or_default();
                    match polarity {
                        Polarity::Avoid => r.avoid_periods.insert(*period),
                        Polarity::Prefer => r.only_periods.insert(*period),
                    };
                }
                ConstraintPayload::Lab { polarity } if c.scope.entity != EntityType::Room => {
                    rules.room_needs.entry(key).or_default().lab =
                        Some(*polarity == Polarity::Prefer);
                }
                ConstraintPayload::Equipment {
                    item,
                    polarity: Polarity::Prefer,
                } if c.scope.entity != EntityType::Room => {
                    rules
                        .room_needs
                        .entry(key)
                        .or_default()
                        .equipment
                        .push(item.clone());
                }
                _ => {}
            }
        }
        rules
    }

    fn slot_ok(&self, entity: EntityType, id: &str, slot: &TimeSlot) -> bool {
        self.slot_rules
            .get(&(entity, id.to_string()))
            .map_or(true, |r| r.allows(slot))
    }

    fn room_ok(&self, entity: EntityType, id: &str, room: &Room) -> bool {
        self.room_needs
            .get(&(entity, id.to_string()))
            .map_or(true, |n| n.met_by(room))
    }

    pub fn allows(&self, course: &Course, instructor: &Instructor, room: &Room, slot: &TimeSlot) -> bool {
        self.slot_ok(EntityType::Course, &course.id.0, slot)
            && self.slot_ok(EntityType::Instructor, &instructor.id.0, slot)
            && self.slot_ok(EntityType::Room, &room.id.0, slot)
            && self.room_ok(EntityType::Course, &course.id.0, room)
            && self.room_ok(EntityType::Instructor, &instructor.id.0, room)
    }
}

/// The four base eligibility rules for a (course, instructor, room, slot).
pub fn base_valid(course: &Course, instructor: &Instructor, room: &Room, slot: &TimeSlot) -> bool {
    instructor.has_expertise_for(course)
        && (!course.requires_lab || room.is_lab)
        && room.capacity >= course.max_enrollment
        && instructor.is_available(slot)
}

/// Per-run lookup tables shared by every solving strategy.
pub struct Prep<'a> {
    pub inst: &'a Instance,
    pub graph: ConflictGraph,
    /// Conflict-graph neighbours by course index.
    pub neighbors: Vec<Vec<usize>>,
    pub idx_course: HashMap<&'a str, usize>,
    pub idx_instructor: HashMap<&'a str, usize>,
    pub idx_room: HashMap<&'a str, usize>,
    pub idx_slot: HashMap<&'a str, usize>,
    pub slot_minutes: Vec<u32>,
    pub rules: HardRules,
}

impl<'a> Prep<'a> {
    pub fn new(inst: &'a Instance) -> Self {
        let graph = ConflictGraph::build(&inst.students);
        let idx_course: HashMap<&str, usize> = inst
            .courses
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.0.as_str(), i))
            .collect();
        let idx_instructor = inst
            .instructors
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.0.as_str(), i))
            .collect();
        let idx_room = inst
            .rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.0.as_str(), i))
            .collect();
        let idx_slot = inst
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.0.as_str(), i))
            .collect();
        let neighbors = inst
            .courses
            .iter()
            .map(|c| {
                graph
                    .neighbors(&c.id)
                    .filter_map(|n| idx_course.get(n.0.as_str()).copied())
                    .collect()
            })
            .collect();
        Self {
            inst,
            neighbors,
            idx_course,
            idx_instructor,
            idx_room,
            idx_slot,
            slot_minutes: inst.slots.iter().map(TimeSlot::duration_minutes).collect(),
            rules: HardRules::from_instance(inst),
            graph,
        }
    }

    pub fn structurally_valid(&self, c: Candidate) -> bool {
        let course = &self.inst.courses[c.course];
        let instructor = &self.inst.instructors[c.instructor];
        let room = &self.inst.rooms[c.room];
        let slot = &self.inst.slots[c.slot];
        base_valid(course, instructor, room, slot) && self.rules.allows(course, instructor, room, slot)
    }

    /// Every structurally valid candidate for one course, in
    /// instructor → slot → room input order.
    pub fn options_for(&self, course: usize) -> Vec<Candidate> {
        let mut out = Vec::new();
        for instructor in 0..self.inst.instructors.len() {
            for slot in 0..self.inst.slots.len() {
                for room in 0..self.inst.rooms.len() {
                    let c = Candidate {
                        course,
                        instructor,
                        room,
                        slot,
                    };
                    if self.structurally_valid(c) {
                        out.push(c);
                    }
                }
            }
        }
        out
    }

    pub fn build_feasible(&self) -> Vec<Vec<Candidate>> {
        (0..self.inst.courses.len())
            .map(|ci| self.options_for(ci))
            .collect()
    }

    pub fn assignment(&self, c: Candidate) -> Assignment {
        let slot = &self.inst.slots[c.slot];
        Assignment {
            course_id: self.inst.courses[c.course].id.clone(),
            instructor_id: self.inst.instructors[c.instructor].id.clone(),
            room_id: self.inst.rooms[c.room].id.clone(),
            slot_id: slot.id.clone(),
            day: slot.day,
        }
    }

    /// `None` when the assignment references an unknown entity.
    pub fn candidate_of(&self, a: &Assignment) -> Option<Candidate> {
        Some(Candidate {
            course: *self.idx_course.get(a.course_id.0.as_str())?,
            instructor: *self.idx_instructor.get(a.instructor_id.0.as_str())?,
            room: *self.idx_room.get(a.room_id.0.as_str())?,
            slot: *self.idx_slot.get(a.slot_id.0.as_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::parse_preference;
    use chrono::NaiveTime;
    use types::{ConstraintScope, CourseId, InstructorId, RoomId, SlotId};

    fn slot(id: &str, day: DayOfWeek, hour: u32) -> TimeSlot {
        TimeSlot {
            id: SlotId::from(id),
            day,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            slot_name: id.into(),
        }
    }

    fn inst() -> Instance {
        let slots = vec![
            slot("mon.9", DayOfWeek::Mon, 9),
            slot("fri.9", DayOfWeek::Fri, 9),
            slot("fri.18", DayOfWeek::Fri, 18),
        ];
        let mut availability = std::collections::BTreeMap::new();
        for s in &slots {
            availability
                .entry(s.day)
                .or_insert_with(std::collections::BTreeSet::new)
                .insert(s.id.clone());
        }
        Instance {
            courses: vec![Course {
                id: CourseId::from("c1"),
                name: "Databases".into(),
                department: "cs".into(),
                max_enrollment: 30,
                requires_lab: true,
                required_expertise_tags: ["db".to_string()].into(),
                ..Default::default()
            }],
            instructors: vec![
                Instructor {
                    id: InstructorId::from("i1"),
                    expertise_tags: ["db".to_string(), "ml".to_string()].into(),
                    availability,
                    ..Default::default()
                },
                Instructor {
                    id: InstructorId::from("i2"),
                    expertise_tags: ["nets".to_string()].into(),
                    ..Default::default()
                },
            ],
            rooms: vec![
                Room {
                    id: RoomId::from("lab"),
                    capacity: 30,
                    is_lab: true,
                    ..Default::default()
                },
                Room {
                    id: RoomId::from("small-lab"),
                    capacity: 10,
                    is_lab: true,
                    ..Default::default()
                },
                Room {
                    id: RoomId::from("hall"),
                    capacity: 200,
                    ..Default::default()
                },
            ],
            slots,
            ..Default::default()
        }
    }

    #[test]
    fn base_rules_filter_expertise_lab_capacity_availability() {
        let inst = inst();
        let prep = Prep::new(&inst);
        let opts = prep.options_for(0);
        assert_eq!(opts.len(), 3);
        assert!(opts.iter().all(|c| c.instructor == 0 && c.room == 0));
    }

    #[test]
    fn hard_preferences_narrow_the_domain() {
        let mut inst = inst();
        let scope = ConstraintScope {
            entity: EntityType::Instructor,
            id: "i1".into(),
        };
        inst.constraints
            .extend(parse_preference("cannot teach on Friday", &scope));
        let prep = Prep::new(&inst);
        let opts = prep.options_for(0);
        assert_eq!(opts.len(), 1);
        assert_eq!(inst.slots[opts[0].slot].id.0, "mon.9");
    }

    #[test]
    fn soft_preferences_do_not_narrow() {
        let mut inst = inst();
        let scope = ConstraintScope {
            entity: EntityType::Instructor,
            id: "i1".into(),
        };
        inst.constraints
            .extend(parse_preference("would rather avoid evenings", &scope));
        assert_eq!(Prep::new(&inst).options_for(0).len(), 3);
    }

    #[test]
    fn assignment_round_trips_through_indices() {
        let inst = inst();
        let prep = Prep::new(&inst);
        let c = prep.options_for(0)[0];
        assert_eq!(prep.candidate_of(&prep.assignment(c)), Some(c));
    }
}
