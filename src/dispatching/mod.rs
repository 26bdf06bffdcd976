//! Candidate prioritization.
//!
//! The classifier tags every candidate with a [`PriorityTier`]; the rule
//! engine then orders candidates competing for a slot by tier, by most
//! remaining hours, and finally by a per-attempt rank (stable on the first
//! attempt, shuffled on retries).
//!
//! # Usage
//!
//! ```
//! use u_timetable::dispatching::{classify, DispatchContext, RuleEngine, TieOrder};
//! use u_timetable::models::{AssignmentCandidate, PriorityTier, Teacher};
//!
//! let mut candidates = vec![
//!     AssignmentCandidate::new("T1", "math", 1, "A", 4),
//!     AssignmentCandidate::new("T1", "music", 1, "A", 1),
//! ];
//! let teachers = vec![Teacher::new("T1")];
//! let context = DispatchContext::from_candidates(&candidates, 3);
//! classify(&mut candidates, &teachers, &context, TieOrder::Stable);
//! assert_eq!(candidates[1].tier, PriorityTier::LowHoursSubject);
//!
//! let order = RuleEngine::standard().sort_indices(&candidates, &context);
//! assert_eq!(order, vec![1, 0]);
//! ```
//!
//! # Custom rules
//!
//! [`RuleEngine`] is also a public extension point: callers may build their
//! own chain from the rules in [`rules`] (including [`rules::ScarceSubject`],
//! which the standard chain does not use) or from their own
//! [`DispatchingRule`] implementations, pick a final [`TieBreaker`], and hand
//! it to the assignment engine with `AssignmentEngine::with_rules`.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod classifier;
mod context;
mod engine;
pub mod rules;

pub use classifier::{classify, TieOrder};
pub use context::DispatchContext;
pub use engine::{RuleEngine, TieBreaker};

pub use crate::models::PriorityTier;

use crate::models::AssignmentCandidate;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (placed first).
pub type RuleScore = f64;

/// A dispatching rule that evaluates candidate priority.
///
/// # Score Convention
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "TIER", "MWKR").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a candidate.
    fn evaluate(&self, candidate: &AssignmentCandidate, context: &DispatchContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
