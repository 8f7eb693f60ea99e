use std::collections::{HashMap, HashSet};
use types::ConflictKind;

use crate::feasibility::{Candidate, Prep};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Clash {
    /// The course already has a placement.
    Course,
    Instructor,
    Room,
    /// A conflict-graph neighbour already sits in the slot.
    Student,
    /// The instructor's weekly hours would be exceeded.
    Load,
}

impl Clash {
    pub fn kind(self) -> ConflictKind {
        match self {
            Clash::Instructor | Clash::Load => ConflictKind::Instructor,
            Clash::Room => ConflictKind::Room,
            Clash::Student | Clash::Course => ConflictKind::Time,
        }
    }
}

/// Running assignment set with constant-time clash checks. Mutated in place
/// by `place`/`remove`, so one instance belongs to exactly one search.
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    instructor: HashSet<(usize, usize)>,
    room: HashSet<(usize, usize)>,
    by_slot: HashMap<usize, Vec<usize>>,
    placed: HashMap<usize, Candidate>,
    load: HashMap<usize, u64>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// All clashes `c` would cause, in check order.
    pub fn clashes(&self, prep: &Prep<'_>, c: Candidate) -> Vec<Clash> {
        let mut out = Vec::new();
        if self.placed.contains_key(&c.course) {
            out.push(Clash::Course);
        }
        if self.instructor.contains(&(c.instructor, c.slot)) {
            out.push(Clash::Instructor);
        }
        if self.room.contains(&(c.room, c.slot)) {
            out.push(Clash::Room);
        }
        if let Some(here) = self.by_slot.get(&c.slot) {
            if here.iter().any(|o| prep.neighbors[c.course].contains(o)) {
                out.push(Clash::Student);
            }
        }
        if let Some(cap) = prep.inst.instructors[c.instructor].weekly_cap_minutes() {
            let used = self.load.get(&c.instructor).copied().unwrap_or(0);
            if used + u64::from(prep.slot_minutes[c.slot]) > cap {
                out.push(Clash::Load);
            }
        }
        out
    }

    pub fn check(&self, prep: &Prep<'_>, c: Candidate) -> Result<(), Clash> {
        match self.clashes(prep, c).first() {
            Some(&clash) => Err(clash),
            None => Ok(()),
        }
    }

    pub fn fits(&self, prep: &Prep<'_>, c: Candidate) -> bool {
        self.check(prep, c).is_ok()
    }

    pub fn place(&mut self, prep: &Prep<'_>, c: Candidate) {
        self.instructor.insert((c.instructor, c.slot));
        self.room.insert((c.room, c.slot));
        self.by_slot.entry(c.slot).or_default().push(c.course);
        self.placed.insert(c.course, c);
        *self.load.entry(c.instructor).or_default() += u64::from(prep.slot_minutes[c.slot]);
    }

    pub fn remove(&mut self, prep: &Prep<'_>, c: Candidate) {
        if self.placed.get(&c.course) != Some(&c) {
            return;
        }
        self.placed.remove(&c.course);
        self.instructor.remove(&(c.instructor, c.slot));
        self.room.remove(&(c.room, c.slot));
        if let Some(v) = self.by_slot.get_mut(&c.slot) {
            v.retain(|&x| x != c.course);
        }
        if let Some(l) = self.load.get_mut(&c.instructor) {
            *l = l.saturating_sub(u64::from(prep.slot_minutes[c.slot]));
        }
    }

    pub fn is_placed(&self, course: usize) -> bool {
        self.placed.contains_key(&course)
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn instructor_busy(&self, instructor: usize, slot: usize) -> bool {
        self.instructor.contains(&(instructor, slot))
    }

    /// Placements sorted by course index.
    pub fn placements(&self) -> Vec<Candidate> {
        let mut v: Vec<Candidate> = self.placed.values().copied().collect();
        v.sort_by_key(|c| c.course);
        v
    }
}

/// Why none of `options` can be placed: structural when there are none,
/// otherwise the dominant clash (student > instructor > room).
pub fn diagnose(prep: &Prep<'_>, occ: &Occupancy, options: &[Candidate]) -> ConflictKind {
    if options.is_empty() {
        return ConflictKind::Structural;
    }
    let seen: HashSet<Clash> = options
        .iter()
        .flat_map(|&c| occ.clashes(prep, c))
        .collect();
    if seen.contains(&Clash::Student) {
        ConflictKind::Time
    } else if seen.contains(&Clash::Instructor) || seen.contains(&Clash::Load) {
        ConflictKind::Instructor
    } else if seen.contains(&Clash::Room) {
        ConflictKind::Room
    } else {
        ConflictKind::Time
    }
}
