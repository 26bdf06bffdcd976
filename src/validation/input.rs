//! Roster integrity checks.
//!
//! Detects problems in teacher, subject, and classroom data that make part
//! of the roster unusable:
//! - Duplicate IDs
//! - Teachers referencing unknown subjects
//! - Restrictions referencing unknown subjects
//! - Subjects without applicable grades or weekly hours
//! - Special-room subjects whose classroom type no classroom provides
//!
//! None of these stop generation; the affected candidates simply cannot
//! be placed.

use std::collections::HashSet;

use crate::models::{Classroom, Subject, Teacher};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A roster validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of roster validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A teacher lists a subject that doesn't exist.
    UnknownSubject,
    /// A restriction names a subject that doesn't exist.
    InvalidRestriction,
    /// A subject has no applicable grade or no positive weekly hours.
    EmptySubject,
    /// No classroom provides a subject's required type.
    MissingClassroomType,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates roster data.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_roster(
    teachers: &[Teacher],
    subjects: &[Subject],
    classrooms: &[Classroom],
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut subject_ids = HashSet::new();
    for s in subjects {
        if !subject_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate subject ID: {}", s.id),
            ));
        }
    }

    let mut teacher_ids = HashSet::new();
    for t in teachers {
        if !teacher_ids.insert(t.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate teacher ID: {}", t.id),
            ));
        }
    }

    let mut room_ids = HashSet::new();
    let mut room_types = HashSet::new();
    for c in classrooms {
        if !room_ids.insert(c.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate classroom ID: {}", c.id),
            ));
        }
        room_types.insert(c.classroom_type.as_str());
    }

    for t in teachers {
        for sid in &t.subject_ids {
            if !subject_ids.contains(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownSubject,
                    format!("Teacher '{}' references unknown subject '{}'", t.id, sid),
                ));
            }
        }
        for r in &t.restrictions {
            if let Some(sid) = r.subject_id.as_deref() {
                if !subject_ids.contains(sid) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidRestriction,
                        format!(
                            "Restriction of teacher '{}' references unknown subject '{}'",
                            t.id, sid
                        ),
                    ));
                }
            }
        }
    }

    for s in subjects {
        if s.grades.is_empty() || s.grades.iter().all(|&g| s.hours_for(g) == 0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptySubject,
                format!("Subject '{}' has no grade with weekly hours", s.id),
            ));
        }
        if let Some(kind) = s.required_room_type() {
            if !room_types.contains(kind) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MissingClassroomType,
                    format!("Subject '{}' needs a '{}' classroom but none exists", s.id, kind),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
