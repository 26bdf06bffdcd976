//! Assignment candidate model.
//!
//! A candidate is one possible (teacher, subject, class) pairing with a
//! weekly quota. Candidates are rebuilt at the start of every engine run
//! and mutated only through [`record_placement`](AssignmentCandidate::record_placement)
//! and [`release_placement`](AssignmentCandidate::release_placement), which
//! keep `assigned_hours` within `0..=required_hours`. Deserialization
//! rejects records that break that bound.

use serde::{Deserialize, Serialize};

use super::{ClassRef, Grade};

/// Placement urgency. Lower tiers are placed first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    /// Covered by a mandatory teacher restriction.
    MandatoryRestriction = 1,
    /// Covered by a recommended teacher restriction.
    RecommendedRestriction = 2,
    /// Subject has few remaining hours overall.
    LowHoursSubject = 3,
    /// Everything else.
    #[default]
    Default = 4,
}

impl PriorityTier {
    /// Numeric rank (1 = most urgent).
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// A (teacher, subject, grade, section) pairing with a weekly quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CandidateRecord")]
pub struct AssignmentCandidate {
    /// Teacher ID.
    pub teacher_id: String,
    /// Subject ID.
    pub subject_id: String,
    /// Grade of the class.
    pub grade: Grade,
    /// Section of the class.
    pub section: String,
    /// Weekly hours to place.
    pub required_hours: u32,
    assigned_hours: u32,
    /// Placement tier assigned by the classifier.
    pub tier: PriorityTier,
    /// Final tie-break rank (lower first). Stable or shuffled per attempt.
    pub order_rank: usize,
}

/// Unchecked wire form of [`AssignmentCandidate`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRecord {
    teacher_id: String,
    subject_id: String,
    grade: Grade,
    section: String,
    required_hours: u32,
    assigned_hours: u32,
    tier: PriorityTier,
    order_rank: usize,
}

impl TryFrom<CandidateRecord> for AssignmentCandidate {
    type Error = String;

    fn try_from(r: CandidateRecord) -> Result<Self, Self::Error> {
        if r.assigned_hours > r.required_hours {
            return Err(format!(
                "assignedHours {} exceeds requiredHours {} for {} / {} in {}-{}",
                r.assigned_hours, r.required_hours, r.teacher_id, r.subject_id, r.grade, r.section
            ));
        }
        Ok(Self {
            teacher_id: r.teacher_id,
            subject_id: r.subject_id,
            grade: r.grade,
            section: r.section,
            required_hours: r.required_hours,
            assigned_hours: r.assigned_hours,
            tier: r.tier,
            order_rank: r.order_rank,
        })
    }
}

impl AssignmentCandidate {
    /// Creates a candidate with no hours assigned.
    pub fn new(
        teacher_id: impl Into<String>,
        subject_id: impl Into<String>,
        grade: Grade,
        section: impl Into<String>,
        required_hours: u32,
    ) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            subject_id: subject_id.into(),
            grade,
            section: section.into(),
            required_hours,
            assigned_hours: 0,
            tier: PriorityTier::Default,
            order_rank: 0,
        }
    }

    /// Hours placed so far.
    #[inline]
    pub fn assigned_hours(&self) -> u32 {
        self.assigned_hours
    }

    /// Hours still to place.
    #[inline]
    pub fn remaining_hours(&self) -> u32 {
        self.required_hours.saturating_sub(self.assigned_hours)
    }

    /// Whether the quota is met.
    #[inline]
    pub fn is_satisfied(&self) -> bool {
        self.assigned_hours >= self.required_hours
    }

    /// Whether the candidate targets a class.
    pub fn is_for_class(&self, grade: Grade, section: &str) -> bool {
        self.grade == grade && self.section == section
    }

    /// The targeted class.
    pub fn class_ref(&self) -> ClassRef {
        ClassRef::new(self.grade, self.section.clone())
    }

    /// Counts one placed hour. Returns `false` (and changes nothing) when
    /// the quota is already met.
    pub fn record_placement(&mut self) -> bool {
        if self.is_satisfied() {
            return false;
        }
        self.assigned_hours += 1;
        true
    }

    /// Undoes one placed hour. Returns `false` when nothing was placed.
    pub fn release_placement(&mut self) -> bool {
        if self.assigned_hours == 0 {
            return false;
        }
        self.assigned_hours -= 1;
        true
    }
}
