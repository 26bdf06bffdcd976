//! Built-in dispatching rules.
//!
//! # Score Convention
//! All rules return lower scores for candidates that should be placed first.

use super::{DispatchContext, DispatchingRule, RuleScore};
use crate::models::AssignmentCandidate;

/// Priority tier (mandatory restriction first, default last).
#[derive(Debug, Clone, Copy)]
pub struct Tier;

impl DispatchingRule for Tier {
    fn name(&self) -> &'static str {
        "TIER"
    }

    fn evaluate(&self, candidate: &AssignmentCandidate, _context: &DispatchContext) -> RuleScore {
        candidate.tier.rank() as f64
    }

    fn description(&self) -> &'static str {
        "Priority Tier"
    }
}

/// Most Work Remaining.
///
/// Prefers candidates with the most hours left to place; they are the
/// hardest to fit late in the week.
#[derive(Debug, Clone, Copy)]
pub struct Mwkr;

impl DispatchingRule for Mwkr {
    fn name(&self) -> &'static str {
        "MWKR"
    }

    fn evaluate(&self, candidate: &AssignmentCandidate, _context: &DispatchContext) -> RuleScore {
        -(candidate.remaining_hours() as f64)
    }

    fn description(&self) -> &'static str {
        "Most Work Remaining"
    }
}

/// Scarcest subject first, by remaining hours across all candidates.
#[derive(Debug, Clone, Copy)]
pub struct ScarceSubject;

impl DispatchingRule for ScarceSubject {
    fn name(&self) -> &'static str {
        "SCARCE"
    }

    fn evaluate(&self, candidate: &AssignmentCandidate, context: &DispatchContext) -> RuleScore {
        context.subject_remaining(&candidate.subject_id) as f64
    }

    fn description(&self) -> &'static str {
        "Scarcest Subject First"
    }
}

/// Per-attempt rank assigned by the classifier.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRank;

impl DispatchingRule for AttemptRank {
    fn name(&self) -> &'static str {
        "RANK"
    }

    fn evaluate(&self, candidate: &AssignmentCandidate, _context: &DispatchContext) -> RuleScore {
        candidate.order_rank as f64
    }

    fn description(&self) -> &'static str {
        "Attempt Order Rank"
    }
}
