//! Seeded generator of plausible disruptions for demos and tests.

use rand::{seq::SliceRandom, Rng};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use types::{
    AffectedResource, Assignment, DisruptionEvent, DisruptionKind, DisruptionSeverity, Impact,
    Instance, ResourceKind,
};

use crate::detector::new_event;
use crate::options::kind_label;

pub struct DisruptionSimulator {
    rng: ChaCha8Rng,
}

impl DisruptionSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One event aimed at something the schedule actually uses, on a day the
    /// schedule has sessions. `None` for an empty schedule.
    pub fn next_event(&mut self, inst: &Instance, schedule: &[Assignment]) -> Option<DisruptionEvent> {
        let a = schedule.choose(&mut self.rng)?.clone();
        let kind = *[
            DisruptionKind::InstructorAbsence,
            DisruptionKind::InstructorAbsence,
            DisruptionKind::RoomUnavailable,
            DisruptionKind::Maintenance,
            DisruptionKind::EquipmentFailure,
            DisruptionKind::ConflictingEvent,
            DisruptionKind::Weather,
            DisruptionKind::StudentEmergency,
        ]
        .choose(&mut self.rng)?;

        let resources = match kind {
            DisruptionKind::InstructorAbsence => {
                vec![AffectedResource::direct(ResourceKind::Instructor, a.instructor_id.0.clone())]
            }
            DisruptionKind::StudentEmergency => {
                vec![AffectedResource::direct(ResourceKind::Course, a.course_id.0.clone())]
            }
            DisruptionKind::Weather | DisruptionKind::Closure => {
                // Every room of the building, the scheduled one first.
                let building = inst.room(&a.room_id).and_then(|r| r.building.clone());
                let mut v = vec![AffectedResource::direct(ResourceKind::Room, a.room_id.0.clone())];
                v.extend(
                    inst.rooms
                        .iter()
                        .filter(|r| r.id != a.room_id && r.building.is_some() && r.building == building)
                        .map(|r| AffectedResource {
                            kind: ResourceKind::Room,
                            id: r.id.0.clone(),
                            impact: Impact::Indirect,
                        }),
                );
                v
            }
            _ => vec![AffectedResource::direct(ResourceKind::Room, a.room_id.0.clone())],
        };

        let severity = match self.rng.gen_range(0..10) {
            0..=3 => DisruptionSeverity::Low,
            4..=6 => DisruptionSeverity::Medium,
            7..=8 => DisruptionSeverity::High,
            _ => DisruptionSeverity::Critical,
        };

        let mut days = BTreeSet::new();
        days.insert(a.day);
        let mut ev = new_event(kind, severity, resources, days);
        ev.description = format!("simulated {} affecting {}", kind_label(kind), ev.affected_resources[0].id);
        Some(ev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::affected_assignments;
    use sched_core::testkit::*;

    fn schedule(inst: &Instance) -> Vec<Assignment> {
        vec![
            assign("algebra", "noether", "hall", "mon.morning", inst),
            assign("physics", "curie", "hall", "tue.afternoon", inst),
        ]
    }

    #[test]
    fn same_seed_same_events() {
        let inst = scenario_a();
        let s = schedule(&inst);
        let mut a = DisruptionSimulator::new(7);
        let mut b = DisruptionSimulator::new(7);
        for _ in 0..5 {
            let (x, y) = (a.next_event(&inst, &s).unwrap(), b.next_event(&inst, &s).unwrap());
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.severity, y.severity);
            assert_eq!(x.affected_resources, y.affected_resources);
            assert_eq!(x.affected_days, y.affected_days);
        }
    }

    #[test]
    fn events_always_hit_the_schedule() {
        let inst = scenario_a();
        let s = schedule(&inst);
        let mut sim = DisruptionSimulator::new(42);
        for _ in 0..20 {
            let ev = sim.next_event(&inst, &s).unwrap();
            assert!(!affected_assignments(&ev, &inst, &s).is_empty(), "{ev:?}");
        }
    }

    #[test]
    fn empty_schedule_yields_none() {
        assert!(DisruptionSimulator::new(1).next_event(&scenario_a(), &[]).is_none());
    }
}
