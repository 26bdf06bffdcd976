//! Dispatching context.

use std::collections::HashMap;

use crate::models::AssignmentCandidate;

/// Aggregate state used to classify and order candidates.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Remaining hours per subject, summed over all candidates.
    pub subject_remaining_hours: HashMap<String, u32>,
    /// Subjects with fewer remaining hours than this count as scarce.
    pub low_hours_threshold: u32,
}

impl DispatchContext {
    /// Builds the context from a candidate list.
    pub fn from_candidates(candidates: &[AssignmentCandidate], low_hours_threshold: u32) -> Self {
        let mut subject_remaining_hours: HashMap<String, u32> = HashMap::new();
        for c in candidates {
            *subject_remaining_hours.entry(c.subject_id.clone()).or_insert(0) +=
                c.remaining_hours();
        }
        Self {
            subject_remaining_hours,
            low_hours_threshold,
        }
    }

    /// Remaining hours of a subject (0 if unknown).
    pub fn subject_remaining(&self, subject_id: &str) -> u32 {
        self.subject_remaining_hours
            .get(subject_id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether a subject is scarce.
    pub fn is_low_hours(&self, subject_id: &str) -> bool {
        self.subject_remaining(subject_id) < self.low_hours_threshold
    }
}
