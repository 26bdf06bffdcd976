//! Input and timetable validation.
//!
//! - **`input`**: roster integrity checks run before generation
//!   (duplicate IDs, dangling references, unusable subjects).
//! - **`report`**: independent audit of a finished timetable, producing a
//!   severity-classified [`ValidationReport`].

mod input;
mod report;

pub use input::{validate_roster, ValidationError, ValidationErrorKind, ValidationResult};
pub use report::{
    validate_timetable, Severity, UnassignedRequirement, ValidationReport, Violation,
    ViolationKind,
};
