//! Candidate enumeration.
//!
//! For every teacher, every subject they teach, every grade the subject
//! applies to (and the teacher may teach), and every section of that
//! grade, one candidate is emitted when the subject has positive weekly
//! hours for the grade. Zero or undefined hours are skipped silently.
//!
//! # Complexity
//! O(teachers × subjects-per-teacher × grades × sections)

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::models::{AssignmentCandidate, ClassRef, Subject, Teacher};

/// Enumerates assignment candidates for the given classes.
pub fn generate_candidates(
    classes: &[ClassRef],
    teachers: &[Teacher],
    subjects: &[Subject],
) -> Vec<AssignmentCandidate> {
    let subject_map: HashMap<&str, &Subject> = subjects.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut candidates = Vec::new();

    for teacher in teachers {
        let mut seen = HashSet::new();
        for subject_id in &teacher.subject_ids {
            if !seen.insert(subject_id.as_str()) {
                continue;
            }
            let Some(subject) = subject_map.get(subject_id.as_str()) else {
                trace!(teacher = %teacher.id, subject = %subject_id, "unknown subject skipped");
                continue;
            };
            for &grade in &subject.grades {
                let hours = subject.hours_for(grade);
                if hours == 0 || !teacher.may_teach_grade(grade) {
                    continue;
                }
                for class in classes.iter().filter(|c| c.grade == grade) {
                    candidates.push(AssignmentCandidate::new(
                        teacher.id.clone(),
                        subject.id.clone(),
                        grade,
                        class.section.clone(),
                        hours,
                    ));
                }
            }
        }
    }

    candidates
}
