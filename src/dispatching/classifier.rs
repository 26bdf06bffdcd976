//! Priority classification.
//!
//! Tiers, most urgent first:
//! 1. `MandatoryRestriction`: the teacher has a mandatory restriction covering the lesson.
//! 2. `RecommendedRestriction`: the teacher has a recommended restriction covering it.
//! 3. `LowHoursSubject`: the subject's remaining hours across all candidates
//!    are below the low-hours threshold.
//! 4. `Default`.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::DispatchContext;
use crate::models::{AssignmentCandidate, PriorityTier, RestrictionLevel, Teacher};

/// Final tie-break order for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieOrder {
    /// Generation order (first attempt, deterministic).
    Stable,
    /// Seeded random permutation (retries).
    Shuffled(u64),
}

/// Assigns a tier and an order rank to every candidate.
pub fn classify(
    candidates: &mut [AssignmentCandidate],
    teachers: &[Teacher],
    context: &DispatchContext,
    order: TieOrder,
) {
    let by_id: HashMap<&str, &Teacher> = teachers.iter().map(|t| (t.id.as_str(), t)).collect();

    for c in candidates.iter_mut() {
        let level = by_id
            .get(c.teacher_id.as_str())
            .and_then(|t| t.restriction_level_for(&c.subject_id, c.grade, &c.section));
        c.tier = match level {
            Some(RestrictionLevel::Mandatory) => PriorityTier::MandatoryRestriction,
            Some(RestrictionLevel::Recommended) => PriorityTier::RecommendedRestriction,
            None if context.is_low_hours(&c.subject_id) => PriorityTier::LowHoursSubject,
            None => PriorityTier::Default,
        };
    }

    let mut ranks: Vec<usize> = (0..candidates.len()).collect();
    if let TieOrder::Shuffled(seed) = order {
        ranks.shuffle(&mut StdRng::seed_from_u64(seed));
    }
    for (c, rank) in candidates.iter_mut().zip(ranks) {
        c.order_rank = rank;
    }
}
