//! School timetable generation and validation.
//!
//! Assigns teachers, subjects, and classrooms to the fixed slots of a school
//! week (day × period × grade × section) under hard and soft constraints,
//! then scores and audits the result.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `SchoolConfiguration`, `Teacher`, `Subject`,
//!   `Classroom`, `AssignmentCandidate`, `Timetable`
//! - **`settings`**: Normalizes partial school settings into a full configuration
//! - **`loader`**: Coerces loosely-typed roster records into the domain types
//! - **`dispatching`**: Priority tiers and candidate ranking rules
//! - **`constraints`**: Placement checks (teacher and classroom occupancy, restrictions)
//! - **`scheduler`**: Grid builder, candidate generator, assignment engine,
//!   retry controller, statistics
//! - **`validation`**: Roster integrity checks and the timetable audit
//! - **`options`**: Generation options, loadable from TOML
//!
//! # Entry points
//!
//! - [`generate`]: best-of-N timetable plus statistics
//! - [`validate`]: severity-classified audit of any timetable
//! - [`analyze`]: grid statistics
//!
//! # Example
//!
//! ```
//! use u_timetable::models::{SchoolConfiguration, Subject, Teacher};
//! use u_timetable::options::GenerateOptions;
//!
//! let config = SchoolConfiguration::new(["Mon", "Tue"], 2).with_grade(1, ["A"]);
//! let teachers = vec![
//!     Teacher::new("T1").with_subject("math"),
//!     Teacher::new("T2").with_subject("art"),
//! ];
//! let subjects = vec![
//!     Subject::new("math").with_weekly_hours(1, 3),
//!     Subject::new("art").with_weekly_hours(1, 1),
//! ];
//!
//! let result = u_timetable::generate(&config, &teachers, &subjects, &[], &GenerateOptions::default()).unwrap();
//! assert_eq!(result.statistics.timetable.assigned_slots, 4);
//!
//! let report = u_timetable::validate(&result.timetable, &teachers, &subjects, &[]);
//! assert!(report.is_valid);
//! ```

pub mod constraints;
pub mod dispatching;
pub mod error;
pub mod loader;
pub mod models;
pub mod options;
pub mod scheduler;
pub mod settings;
pub mod validation;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use error::{Result, TimetableError};

use models::{Classroom, SchoolConfiguration, Subject, Teacher, Timetable};
use options::GenerateOptions;
use scheduler::{GenerationResult, RetryController, TimetableStatistics};
use validation::ValidationReport;

/// Generates a timetable, keeping the best of up to `max_retries` attempts.
///
/// A timetable with empty slots is a normal result; inspect
/// `statistics.timetable.assignment_rate` and
/// `statistics.unassigned_requirements` to judge it.
///
/// # Errors
/// [`TimetableError::InvalidConfiguration`] for a configuration without
/// days, grades, or sections, or with a zero-period day.
pub fn generate(
    config: &SchoolConfiguration,
    teachers: &[Teacher],
    subjects: &[Subject],
    classrooms: &[Classroom],
    options: &GenerateOptions,
) -> Result<GenerationResult> {
    RetryController::new(config, teachers, subjects, classrooms, options).run()
}

/// [`generate`] with a cancellation flag checked between slots.
///
/// On cancellation the best finished attempt is returned with
/// `statistics.cancelled` set.
///
/// # Errors
/// As [`generate`], plus [`TimetableError::Cancelled`] when no attempt
/// finished before the flag was raised.
pub fn generate_with_cancel(
    config: &SchoolConfiguration,
    teachers: &[Teacher],
    subjects: &[Subject],
    classrooms: &[Classroom],
    options: &GenerateOptions,
    cancel: Arc<AtomicBool>,
) -> Result<GenerationResult> {
    RetryController::new(config, teachers, subjects, classrooms, options)
        .with_cancel_flag(cancel)
        .run()
}

/// Audits a timetable against the roster.
pub fn validate(
    grid: &Timetable,
    teachers: &[Teacher],
    subjects: &[Subject],
    classrooms: &[Classroom],
) -> ValidationReport {
    validation::validate_timetable(grid, teachers, subjects, classrooms)
}

/// Computes grid statistics.
pub fn analyze(grid: &Timetable) -> TimetableStatistics {
    scheduler::analyze(grid)
}
