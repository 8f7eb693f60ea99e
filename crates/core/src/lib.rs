pub mod audit;
pub mod feasibility;
pub mod graph;
pub mod occupancy;
pub mod prefs;
pub mod scoring;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub use feasibility::{Candidate, Prep};
pub use graph::ConflictGraph;
pub use occupancy::{Clash, Occupancy};
pub use types::{
    Assignment, ConflictInfo, ConflictKind, Course, GenerationConfig, GenerationRequest, Instance,
    Instructor, OptimizationResult, Room, Severity, Strategy, Student, TimeSlot,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid instance: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ValidationError {
    pub fn messages(&self) -> &[String] {
        match self {
            ValidationError::Invalid(v) => v,
        }
    }
}

const HOURS_PER_WEEK: u32 = 7 * 24;

pub fn validate(inst: &Instance) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if inst.slots.is_empty() {
        errors.push("slots is empty".into());
    }

    fn chk_unique<'a>(name: &str, ids: impl Iterator<Item = &'a String>, errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                errors.push(format!("duplicate {name} id: {id}"));
            }
        }
    }
    chk_unique("course", inst.courses.iter().map(|x| &x.id.0), &mut errors);
    chk_unique(
        "instructor",
        inst.instructors.iter().map(|x| &x.id.0),
        &mut errors,
    );
    chk_unique("room", inst.rooms.iter().map(|x| &x.id.0), &mut errors);
    chk_unique("slot", inst.slots.iter().map(|x| &x.id.0), &mut errors);
    chk_unique("student", inst.students.iter().map(|x| &x.id.0), &mut errors);
    chk_unique(
        "constraint",
        inst.constraints.iter().map(|x| &x.id.0),
        &mut errors,
    );

    for s in &inst.slots {
        if s.start_time >= s.end_time {
            errors.push(format!("slot {} ends before it starts", s.id));
        }
    }

    for t in &inst.instructors {
        if t.max_hours_per_week > HOURS_PER_WEEK {
            errors.push(format!(
                "instructor {} has a weekly limit of {} hours, more than a week holds",
                t.id, t.max_hours_per_week
            ));
        }
        for (day, ids) in &t.availability {
            for id in ids {
                match inst.slot(id) {
                    None => errors.push(format!(
                        "instructor {} is available in unknown slot {}",
                        t.id, id
                    )),
                    Some(s) if s.day != *day => errors.push(format!(
                        "instructor {} lists slot {} under {} but it is on {}",
                        t.id, id, day, s.day
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    let courses: HashSet<_> = inst.courses.iter().map(|c| &c.id).collect();
    for s in &inst.students {
        for c in &s.enrolled_course_ids {
            if !courses.contains(c) {
                errors.push(format!("student {} enrolled in unknown course {}", s.id, c));
            }
        }
    }

    for c in &inst.constraints {
        if !(1..=10).contains(&c.priority) {
            errors.push(format!(
                "constraint {} has priority {} outside 1..=10",
                c.id, c.priority
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Invalid(errors))
    }
}

/// Shared flag a caller flips to stop a running solve at its next check point.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exhausted {
    Iterations,
    Time,
    Cancelled,
}

impl Exhausted {
    pub fn describe(self) -> &'static str {
        match self {
            Exhausted::Iterations => "max iterations reached",
            Exhausted::Time => "time limit reached",
            Exhausted::Cancelled => "run cancelled",
        }
    }
}

/// Iteration, wall-clock and cancellation limits of one run.
#[derive(Clone, Debug)]
pub struct Budget {
    started: Instant,
    time_limit: Duration,
    max_iterations: u64,
    iterations: u64,
    cancel: CancelToken,
}

impl Budget {
    pub fn new(cfg: &GenerationConfig, cancel: CancelToken) -> Self {
        Self {
            started: Instant::now(),
            time_limit: Duration::from_millis(cfg.time_limit_ms),
            max_iterations: cfg.max_iterations,
            iterations: 0,
            cancel,
        }
    }

    /// Counts one iteration and reports the first exceeded limit.
    pub fn tick(&mut self) -> Result<(), Exhausted> {
        self.iterations += 1;
        if self.iterations > self.max_iterations {
            return Err(Exhausted::Iterations);
        }
        self.check()
    }

    /// Checks time and cancellation without counting an iteration.
    pub fn check(&self) -> Result<(), Exhausted> {
        if self.cancel.is_cancelled() {
            return Err(Exhausted::Cancelled);
        }
        if self.started.elapsed() > self.time_limit {
            return Err(Exhausted::Time);
        }
        Ok(())
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(
        &self,
        req: GenerationRequest,
        cancel: CancelToken,
    ) -> anyhow::Result<OptimizationResult>;
}
