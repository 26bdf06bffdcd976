//! Timetable generation.
//!
//! Pipeline, leaf first:
//!
//! 1. [`build_grid`]: empty slot grid from a [`SchoolConfiguration`](crate::models::SchoolConfiguration).
//! 2. [`generate_candidates`]: `(teacher, subject, grade, section, hours)` tuples.
//! 3. [`AssignmentEngine`]: fills one grid slot by slot, ranking candidates
//!    with the dispatching rules and checking them with the
//!    [`ConstraintChecker`](crate::constraints::ConstraintChecker).
//! 4. [`RetryController`]: independent engine attempts, best result kept.
//! 5. [`analyze`]: grid statistics and quality score.
//!
//! # Search
//!
//! Tolerant mode (the default) is greedy with skip: a slot no candidate
//! fits stays empty. Strict mode backtracks chronologically over an undo
//! stack, bounded by a backtrack ceiling.

mod candidates;
mod engine;
mod grid;
mod kpi;
mod retry;

pub use candidates::generate_candidates;
pub use engine::{AssignmentEngine, EngineOutcome, EngineSettings};
pub use grid::build_grid;
pub use kpi::{
    analyze, teacher_loads, teacher_utilization_rate, TeacherLoad, TimetableStatistics,
    MAX_VIOLATION_PENALTY, VIOLATION_PENALTY,
};
pub(crate) use kpi::round2;
pub use retry::{
    quality_message, GenerationAttempt, GenerationResult, GenerationStatistics, RetryController,
};
