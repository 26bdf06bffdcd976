//! Rule engine for multi-criteria candidate ordering.
//!
//! Rules are applied in sequence; a later rule is consulted only when all
//! earlier rules tie.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::rules::{AttemptRank, Mwkr, Tier};
use super::{DispatchContext, DispatchingRule};
use crate::models::AssignmentCandidate;

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    InputOrder,
    /// Deterministic by (teacher, subject, grade, section).
    ByKey,
}

/// A composable rule engine for candidate prioritization.
///
/// # Example
/// ```
/// use u_timetable::dispatching::{RuleEngine, rules};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Tier)
///     .with_rule(rules::ScarceSubject);
/// assert_eq!(engine.rule_names(), vec!["TIER", "SCARCE"]);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<Arc<dyn DispatchingRule>>,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            tie_breaker: TieBreaker::InputOrder,
            epsilon: 1e-9,
        }
    }

    /// Tier, then most remaining hours, then attempt rank.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(Tier)
            .with_rule(Mwkr)
            .with_rule(AttemptRank)
    }

    /// Appends a rule.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Sorts all candidates by priority (highest first), returning indices.
    pub fn sort_indices(
        &self,
        candidates: &[AssignmentCandidate],
        context: &DispatchContext,
    ) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..candidates.len()).collect();
        self.sort_subset(candidates, &mut indices, context);
        indices
    }

    /// Sorts a subset of candidate indices in place (highest priority first).
    pub fn sort_subset(
        &self,
        candidates: &[AssignmentCandidate],
        indices: &mut [usize],
        context: &DispatchContext,
    ) {
        indices.sort_by(|&a, &b| self.compare(&candidates[a], &candidates[b], context));
    }

    /// Compares two candidates.
    pub fn compare(
        &self,
        a: &AssignmentCandidate,
        b: &AssignmentCandidate,
        context: &DispatchContext,
    ) -> Ordering {
        for rule in &self.rules {
            let score_a = rule.evaluate(a, context);
            let score_b = rule.evaluate(b, context);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }

        match &self.tie_breaker {
            TieBreaker::InputOrder => Ordering::Equal,
            TieBreaker::ByKey => (&a.teacher_id, &a.subject_id, a.grade, &a.section).cmp(&(
                &b.teacher_id,
                &b.subject_id,
                b.grade,
                &b.section,
            )),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::rules;
    use crate::models::PriorityTier;

    fn make(teacher: &str, hours: u32, tier: PriorityTier, rank: usize) -> AssignmentCandidate {
        let mut c = AssignmentCandidate::new(teacher, "math", 1, "A", hours);
        c.tier = tier;
        c.order_rank = rank;
        c
    }

    #[test]
    fn test_tier_dominates_hours() {
        let candidates = vec![
            make("big", 6, PriorityTier::Default, 0),
            make("restricted", 1, PriorityTier::MandatoryRestriction, 1),
            make("soft", 2, PriorityTier::RecommendedRestriction, 2),
        ];
        let ctx = DispatchContext::from_candidates(&candidates, 0);
        let order = RuleEngine::standard().sort_indices(&candidates, &ctx);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_remaining_hours_descending_within_tier() {
        let candidates = vec![
            make("few", 2, PriorityTier::Default, 0),
            make("many", 5, PriorityTier::Default, 1),
        ];
        let ctx = DispatchContext::from_candidates(&candidates, 0);
        assert_eq!(RuleEngine::standard().sort_indices(&candidates, &ctx)[0], 1);
    }

    #[test]
    fn test_rank_breaks_ties() {
        let candidates = vec![
            make("A", 3, PriorityTier::Default, 5),
            make("B", 3, PriorityTier::Default, 2),
        ];
        let ctx = DispatchContext::from_candidates(&candidates, 0);
        assert_eq!(RuleEngine::standard().sort_indices(&candidates, &ctx)[0], 1);
    }

    #[test]
    fn test_by_key_tie_breaker() {
        let candidates = vec![
            make("T9", 3, PriorityTier::Default, 0),
            make("T1", 3, PriorityTier::Default, 0),
        ];
        let ctx = DispatchContext::from_candidates(&candidates, 0);
        let engine = RuleEngine::new()
            .with_rule(rules::Tier)
            .with_final_tie_breaker(TieBreaker::ByKey);
        assert_eq!(engine.sort_indices(&candidates, &ctx), vec![1, 0]);

        let stable = RuleEngine::new().with_rule(rules::Tier);
        assert_eq!(stable.sort_indices(&candidates, &ctx), vec![0, 1]);
    }

    #[test]
    fn test_sort_subset() {
        let candidates = vec![
            make("A", 1, PriorityTier::Default, 0),
            make("B", 4, PriorityTier::Default, 1),
            make("C", 9, PriorityTier::Default, 2),
        ];
        let ctx = DispatchContext::from_candidates(&candidates, 0);
        let mut subset = vec![0, 1];
        RuleEngine::standard().sort_subset(&candidates, &mut subset, &ctx);
        assert_eq!(subset, vec![1, 0]);
    }

    #[test]
    fn test_empty_candidate_list() {
        let ctx = DispatchContext::default();
        assert!(RuleEngine::standard().sort_indices(&[], &ctx).is_empty());
    }
}
