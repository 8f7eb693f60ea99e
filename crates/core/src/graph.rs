use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use types::{CourseId, Student};

/// Course pairs that share at least one enrolled student.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConflictGraph {
    adj: BTreeMap<CourseId, BTreeSet<CourseId>>,
}

impl ConflictGraph {
    pub fn build(students: &[Student]) -> Self {
        let mut adj: BTreeMap<CourseId, BTreeSet<CourseId>> = BTreeMap::new();
        for s in students {
            let enrolled: Vec<&CourseId> = s.enrolled_course_ids.iter().collect();
            for (i, a) in enrolled.iter().enumerate() {
                for b in &enrolled[i + 1..] {
                    if a == b {
                        continue;
                    }
                    adj.entry((*a).clone()).or_default().insert((*b).clone());
                    adj.entry((*b).clone()).or_default().insert((*a).clone());
                }
            }
        }
        Self { adj }
    }

    pub fn neighbors(&self, course: &CourseId) -> impl Iterator<Item = &CourseId> {
        self.adj.get(course).into_iter().flatten()
    }

    pub fn conflicts(&self, a: &CourseId, b: &CourseId) -> bool {
        self.adj.get(a).is_some_and(|n| n.contains(b))
    }

    pub fn degree(&self, course: &CourseId) -> usize {
        self.adj.get(course).map_or(0, |n| n.len())
    }

    pub fn edge_count(&self) -> usize {
        self.adj.values().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn adjacency(&self) -> &BTreeMap<CourseId, BTreeSet<CourseId>> {
        &self.adj
    }
}
