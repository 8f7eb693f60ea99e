use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use types::{Assignment, ConstraintPayload, DayOfWeek, EntityType, Instance, Polarity};

/// Soft-constraint breakdown of a finished schedule. Never affects the
/// 0..=100 result score.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SoftScores {
    pub satisfied: i64,
    pub violated: i64,
    /// Sum of priorities of violated soft constraints.
    pub weighted_penalty: i64,
    pub preferred_slot_hits: i64,
    pub windows_instructors: BTreeMap<String, i64>,
    pub windows_total: i64,
}

pub fn compute_soft_scores(inst: &Instance, assignments: &[Assignment]) -> SoftScores {
    let mut s = SoftScores::default();

    for c in inst.constraints.iter().filter(|c| !c.is_hard()) {
        for a in assignments {
            let applies = match c.scope.entity {
                EntityType::Instructor => a.instructor_id.0 == c.scope.id,
                EntityType::Room => a.room_id.0 == c.scope.id,
                EntityType::Course => a.course_id.0 == c.scope.id,
            };
            if !applies {
                continue;
            }
            let (Some(slot), Some(room)) = (inst.slot(&a.slot_id), inst.room(&a.room_id)) else {
                continue;
            };
            let (holds, polarity) = match &c.payload {
                ConstraintPayload::TimeOfDay { period, polarity } => (slot.period() == *period, *polarity),
                ConstraintPayload::Day { day, polarity } => (slot.day == *day, *polarity),
                ConstraintPayload::Lab { polarity } => (room.is_lab, *polarity),
                ConstraintPayload::Equipment { item, polarity } => {
                    (room.equipment.contains(item), *polarity)
                }
            };
            let ok = match polarity {
                Polarity::Prefer => holds,
                Polarity::Avoid => !holds,
            };
            if ok {
                s.satisfied += 1;
            } else {
                s.violated += 1;
                s.weighted_penalty += i64::from(c.priority);
            }
        }
    }

    for a in assignments {
        let (Some(ins), Some(slot)) = (inst.instructor(&a.instructor_id), inst.slot(&a.slot_id)) else {
            continue;
        };
        if ins.preferred_slot_names.iter().any(|n| *n == slot.slot_name) {
            s.preferred_slot_hits += 1;
        }
    }

    // Day order of every slot, so "adjacent" means consecutive in the grid.
    let mut day_rank: HashMap<&str, (DayOfWeek, usize)> = HashMap::new();
    let mut by_day: BTreeMap<DayOfWeek, Vec<&types::TimeSlot>> = BTreeMap::new();
    for t in &inst.slots {
        by_day.entry(t.day).or_default().push(t);
    }
    for (day, v) in by_day.iter_mut() {
        v.sort_by_key(|t| t.start_time);
        for (k, t) in v.iter().enumerate() {
            day_rank.insert(t.id.0.as_str(), (*day, k));
        }
    }

    let mut taught: BTreeMap<(&str, DayOfWeek), Vec<usize>> = BTreeMap::new();
    for a in assignments {
        if let Some(&(day, k)) = day_rank.get(a.slot_id.0.as_str()) {
            taught.entry((a.instructor_id.0.as_str(), day)).or_default().push(k);
        }
    }
    for ((ins, _day), mut ks) in taught {
        ks.sort_unstable();
        ks.dedup();
        let blocks = 1 + ks.windows(2).filter(|w| w[1] != w[0] + 1).count() as i64;
        let windows = blocks - 1;
        if windows != 0 {
            *s.windows_instructors.entry(ins.to_string()).or_default() += windows;
        }
    }
    s.windows_total = s.windows_instructors.values().sum();
    s
}
