//! Slot-by-slot assignment engine.
//!
//! # Algorithm
//!
//! 1. Build a fresh grid and candidate list, classify candidates.
//! 2. Visit slots in day, period, class order.
//! 3. For each slot, rank the class's eligible candidates with the
//!    [`RuleEngine`] and place the first one the [`ConstraintChecker`] accepts.
//! 4. If nothing fits and the class still has outstanding demand:
//!    - tolerant mode leaves the slot empty and moves on;
//!    - strict mode undoes the most recent placement and tries its next
//!      alternative (chronological backtracking), up to `backtrack_limit`
//!      backtracks, then continues tolerantly.
//!
//! An engine is consumed by [`AssignmentEngine::run`]; every attempt builds a
//! new one, so no state carries over between attempts.
//!
//! # Complexity
//! Tolerant: O(slots × candidates-per-class × log). Strict mode is bounded
//! by the backtrack limit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{build_grid, generate_candidates};
use crate::constraints::{ConstraintChecker, Placement, PlacementLedger};
use crate::dispatching::{classify, DispatchContext, RuleEngine, TieOrder};
use crate::error::{Result, TimetableError};
use crate::models::{
    AssignmentCandidate, Classroom, SchoolConfiguration, SlotAssignment, SlotPosition,
    SlotViolation, Subject, Teacher, Timetable,
};
use crate::options::GenerateOptions;

/// Per-run engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Skip unfillable slots instead of backtracking.
    pub tolerant_mode: bool,
    /// Maximum number of backtracks in strict mode.
    pub backtrack_limit: usize,
    /// Subjects with fewer remaining hours are LOW_HOURS.
    pub low_hours_threshold: u32,
    /// Final tie-break order.
    pub tie_order: TieOrder,
}

impl EngineSettings {
    /// Settings for one attempt under the given options.
    pub fn from_options(options: &GenerateOptions, tie_order: TieOrder) -> Self {
        Self {
            tolerant_mode: options.tolerant_mode,
            backtrack_limit: options.backtrack_limit,
            low_hours_threshold: options.low_hours_threshold,
            tie_order,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_options(&GenerateOptions::default(), TieOrder::Stable)
    }
}

/// Result of one engine run.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// The filled grid.
    pub timetable: Timetable,
    /// Candidates with their final assigned hours.
    pub candidates: Vec<AssignmentCandidate>,
    /// Slots left empty.
    pub unassigned: Vec<SlotPosition>,
    /// Backtracks performed.
    pub backtracks: usize,
    /// Whether strict search gave up and continued tolerantly.
    pub degraded: bool,
}

/// One placement choice at a slot.
#[derive(Debug, Clone)]
struct PlacementOption {
    candidate: usize,
    classroom_id: Option<String>,
    soft_violations: Vec<SlotViolation>,
}

/// Undo-stack frame: a placement and the alternatives not yet tried.
#[derive(Debug)]
struct Frame {
    step: usize,
    options: Vec<PlacementOption>,
    next: usize,
}

/// Fills one timetable grid.
///
/// # Example
///
/// ```
/// use u_timetable::models::{SchoolConfiguration, Subject, Teacher};
/// use u_timetable::scheduler::{AssignmentEngine, EngineSettings};
///
/// let config = SchoolConfiguration::new(["Mon"], 2).with_grade(1, ["A"]);
/// let teachers = vec![Teacher::new("T1").with_subject("math")];
/// let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
///
/// let engine = AssignmentEngine::new(&config, &teachers, &subjects, &[], EngineSettings::default()).unwrap();
/// assert_eq!(engine.peek_candidates().len(), 1);
///
/// let outcome = engine.run().unwrap();
/// assert_eq!(outcome.timetable.assigned_slots(), 2);
/// assert!(outcome.unassigned.is_empty());
/// ```
pub struct AssignmentEngine<'a> {
    checker: ConstraintChecker<'a>,
    rules: RuleEngine,
    context: DispatchContext,
    settings: EngineSettings,
    grid: Timetable,
    candidates: Vec<AssignmentCandidate>,
    ledger: PlacementLedger,
    placed: HashMap<SlotPosition, usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> AssignmentEngine<'a> {
    /// Builds a fresh grid and classified candidate list.
    ///
    /// # Errors
    /// Fails only for an unusable configuration.
    pub fn new(
        config: &SchoolConfiguration,
        teachers: &'a [Teacher],
        subjects: &'a [Subject],
        classrooms: &'a [Classroom],
        settings: EngineSettings,
    ) -> Result<Self> {
        let grid = build_grid(config)?;
        let mut candidates = generate_candidates(&config.classes(), teachers, subjects);
        let context = DispatchContext::from_candidates(&candidates, settings.low_hours_threshold);
        classify(&mut candidates, teachers, &context, settings.tie_order);

        Ok(Self {
            checker: ConstraintChecker::new(teachers, subjects, classrooms),
            rules: RuleEngine::standard(),
            context,
            settings,
            grid,
            candidates,
            ledger: PlacementLedger::new(),
            placed: HashMap::new(),
            cancel: None,
        })
    }

    /// Replaces the candidate ranking rules.
    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    /// Sets a flag that aborts the run when raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Read-only view of the candidate list.
    pub fn peek_candidates(&self) -> &[AssignmentCandidate] {
        &self.candidates
    }

    /// Read-only view of the grid.
    pub fn timetable(&self) -> &Timetable {
        &self.grid
    }

    /// Visits every slot once and returns the filled grid.
    ///
    /// # Errors
    /// [`TimetableError::Cancelled`] if the cancel flag was raised. The
    /// partially filled state is dropped with the engine.
    pub fn run(mut self) -> Result<EngineOutcome> {
        let positions = self.grid.positions();
        let mut stack: Vec<Frame> = Vec::new();
        let mut tolerant = self.settings.tolerant_mode;
        let mut degraded = false;
        let mut backtracks = 0usize;
        let mut step = 0usize;

        while step < positions.len() {
            if self.is_cancelled() {
                debug!(step, "engine run cancelled");
                return Err(TimetableError::Cancelled);
            }
            let pos = positions[step];
            let options = self.ranked_options(pos, !tolerant);

            if let Some(first) = options.first().cloned() {
                self.apply(pos, first);
                if !tolerant {
                    stack.push(Frame { step, options, next: 1 });
                }
                step += 1;
                continue;
            }

            if tolerant || !self.has_outstanding_demand(pos) {
                step += 1;
                continue;
            }

            if backtracks >= self.settings.backtrack_limit {
                warn!(
                    backtracks,
                    limit = self.settings.backtrack_limit,
                    "backtrack limit reached, continuing in tolerant mode"
                );
                tolerant = true;
                degraded = true;
                stack.clear();
                step += 1;
                continue;
            }

            backtracks += 1;
            match self.backtrack(&mut stack, &positions) {
                Some(resume) => {
                    debug!(backtracks, from = step, resume, "backtracked");
                    step = resume;
                }
                None => {
                    warn!(backtracks, "search space exhausted, restarting in tolerant mode");
                    tolerant = true;
                    degraded = true;
                    step = 0;
                }
            }
        }

        let unassigned = positions
            .iter()
            .copied()
            .filter(|&p| self.grid.slot(p).is_some_and(|s| !s.is_assigned()))
            .collect();

        Ok(EngineOutcome {
            timetable: self.grid,
            candidates: self.candidates,
            unassigned,
            backtracks,
            degraded,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Indices of candidates that could still fill a slot of this class.
    fn eligible(&self, pos: SlotPosition) -> Vec<usize> {
        let Some(slot) = self.grid.slot(pos) else {
            return Vec::new();
        };
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                !c.is_satisfied()
                    && c.is_for_class(slot.grade, &slot.section)
                    && self
                        .ledger
                        .class_subject_hours(c.grade, &c.section, &c.subject_id)
                        < c.required_hours
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn has_outstanding_demand(&self, pos: SlotPosition) -> bool {
        !self.eligible(pos).is_empty()
    }

    /// Valid placements in priority order. Stops at the first one unless
    /// all alternatives are wanted.
    fn ranked_options(&self, pos: SlotPosition, all: bool) -> Vec<PlacementOption> {
        let mut order = self.eligible(pos);
        self.rules
            .sort_subset(&self.candidates, &mut order, &self.context);

        let mut options = Vec::new();
        for i in order {
            let candidate = &self.candidates[i];
            match self.checker.check(&self.grid, &self.ledger, pos, candidate) {
                Placement::Allowed {
                    classroom_id,
                    soft_violations,
                } => {
                    options.push(PlacementOption {
                        candidate: i,
                        classroom_id,
                        soft_violations,
                    });
                    if !all {
                        break;
                    }
                }
                Placement::Rejected(reason) => {
                    trace!(
                        teacher = %candidate.teacher_id,
                        subject = %candidate.subject_id,
                        class = %candidate.class_ref(),
                        %reason,
                        "placement rejected"
                    );
                }
            }
        }
        options
    }

    fn apply(&mut self, pos: SlotPosition, option: PlacementOption) {
        let Some(candidate) = self.candidates.get_mut(option.candidate) else {
            return;
        };
        let Some(slot) = self.grid.slot_mut(pos) else {
            return;
        };
        if !candidate.record_placement() {
            return;
        }
        self.ledger.record(candidate);
        slot.assign(
            SlotAssignment {
                teacher_id: candidate.teacher_id.clone(),
                subject_id: candidate.subject_id.clone(),
                classroom_id: option.classroom_id,
            },
            option.soft_violations,
        );
        self.placed.insert(pos, option.candidate);
    }

    fn undo(&mut self, pos: SlotPosition) {
        let Some(index) = self.placed.remove(&pos) else {
            return;
        };
        if let Some(slot) = self.grid.slot_mut(pos) {
            slot.clear();
        }
        if let Some(candidate) = self.candidates.get_mut(index) {
            if candidate.release_placement() {
                self.ledger.release(candidate);
            }
        }
    }

    /// Pops frames until one has an untried alternative, applies it, and
    /// returns the step to resume from.
    fn backtrack(&mut self, stack: &mut Vec<Frame>, positions: &[SlotPosition]) -> Option<usize> {
        while let Some(mut frame) = stack.pop() {
            let pos = positions[frame.step];
            self.undo(pos);
            if let Some(option) = frame.options.get(frame.next).cloned() {
                frame.next += 1;
                self.apply(pos, option);
                let resume = frame.step + 1;
                stack.push(frame);
                return Some(resume);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Restriction;

    fn strict() -> EngineSettings {
        EngineSettings {
            tolerant_mode: false,
            ..EngineSettings::default()
        }
    }

    fn single_class(periods: u32) -> SchoolConfiguration {
        SchoolConfiguration::new(["Mon"], periods).with_grade(1, ["A"])
    }

    fn run(
        config: &SchoolConfiguration,
        teachers: &[Teacher],
        subjects: &[Subject],
        classrooms: &[Classroom],
        settings: EngineSettings,
    ) -> EngineOutcome {
        AssignmentEngine::new(config, teachers, subjects, classrooms, settings)
            .unwrap()
            .run()
            .unwrap()
    }

    #[test]
    fn test_fills_all_slots() {
        let config = single_class(2);
        let teachers = vec![Teacher::new("T1").with_subject("math")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        assert_eq!(out.timetable.assigned_slots(), 2);
        assert_eq!(out.candidates[0].assigned_hours(), 2);
        assert!(out.unassigned.is_empty());
        assert_eq!(out.backtracks, 0);
    }

    #[test]
    fn test_excess_demand_leaves_remaining_hours() {
        let config = single_class(2);
        let teachers = vec![Teacher::new("T1").with_subject("math")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 3)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        assert_eq!(out.timetable.assigned_slots(), 2);
        assert_eq!(out.candidates[0].remaining_hours(), 1);
    }

    #[test]
    fn test_class_subject_hours_shared_between_teachers() {
        let config = single_class(3);
        let teachers = vec![
            Teacher::new("T1").with_subject("math"),
            Teacher::new("T2").with_subject("math"),
        ];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 1)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        assert_eq!(out.timetable.assigned_slots(), 1);
        let total: u32 = out.candidates.iter().map(|c| c.assigned_hours()).sum();
        assert_eq!(total, 1);
        assert_eq!(out.unassigned.len(), 2);
    }

    #[test]
    fn test_teacher_never_double_booked() {
        let config = SchoolConfiguration::new(["Mon"], 2).with_grade(1, ["A", "B"]);
        let teachers = vec![Teacher::new("T1").with_subject("math")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        for period in &out.timetable.grid[0] {
            assert!(period.iter().filter(|s| s.is_taught_by("T1")).count() <= 1);
        }
        assert_eq!(out.timetable.assigned_slots(), 2);
    }

    #[test]
    fn test_special_room_assigned() {
        let config = SchoolConfiguration::new(["Mon"], 1).with_grade(1, ["A", "B"]);
        let teachers = vec![
            Teacher::new("T1").with_subject("lab"),
            Teacher::new("T2").with_subject("lab"),
        ];
        let subjects = vec![Subject::new("lab")
            .with_weekly_hours(1, 1)
            .with_special_room("science")];
        let rooms = vec![Classroom::new("R1", "science")];
        let out = run(&config, &teachers, &subjects, &rooms, EngineSettings::default());

        let used: Vec<_> = out.timetable.slots().filter_map(|s| s.classroom_id.as_deref()).collect();
        assert_eq!(used, vec!["R1"]);
        assert_eq!(out.timetable.assigned_slots(), 1);
    }

    #[test]
    fn test_mandatory_restriction_respected() {
        let config = single_class(2);
        let teachers = vec![Teacher::new("T1")
            .with_subject("math")
            .with_restriction(Restriction::mandatory(1).blocking("Mon", 1))];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        assert!(!out.timetable.grid[0][0][0].is_assigned());
        assert!(out.timetable.grid[0][1][0].is_taught_by("T1"));
    }

    #[test]
    fn test_recommended_restriction_flags_slot() {
        let config = single_class(1);
        let teachers = vec![Teacher::new("T1")
            .with_subject("math")
            .with_restriction(Restriction::recommended(1).blocking("Mon", 1))];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 1)];
        let out = run(&config, &teachers, &subjects, &[], EngineSettings::default());

        assert_eq!(out.timetable.assigned_slots(), 1);
        assert_eq!(out.timetable.violation_count(), 1);
    }

    #[test]
    fn test_deterministic_first_attempt() {
        let config = SchoolConfiguration::new(["Mon", "Tue"], 3).with_grade(1, ["A", "B"]);
        let teachers = vec![
            Teacher::new("T1").with_subject("math").with_subject("art"),
            Teacher::new("T2").with_subject("math"),
        ];
        let subjects = vec![
            Subject::new("math").with_weekly_hours(1, 4),
            Subject::new("art").with_weekly_hours(1, 2),
        ];
        let a = run(&config, &teachers, &subjects, &[], EngineSettings::default());
        let b = run(&config, &teachers, &subjects, &[], EngineSettings::default());
        assert_eq!(a.timetable, b.timetable);
    }

    #[test]
    fn test_strict_backtracking_recovers() {
        // T1 may not teach art to 2-A in Mon period 2, so art has to leave
        // 1-A in period 1 for both classes to be filled.
        let config = SchoolConfiguration::new(["Mon"], 2)
            .with_grade(1, ["A"])
            .with_grade(2, ["A"]);
        let teachers = vec![
            Teacher::new("T1").with_subject("art").with_restriction(
                Restriction::mandatory(2).with_subject("art").blocking("Mon", 2),
            ),
            Teacher::new("T2").with_subject("music"),
            Teacher::new("T3").with_subject("gym"),
        ];
        let subjects = vec![
            Subject::new("art").with_weekly_hours(1, 1).with_weekly_hours(2, 1),
            Subject::new("music").with_weekly_hours(1, 1),
            Subject::new("gym").with_weekly_hours(2, 1),
        ];
        let classrooms: Vec<Classroom> = Vec::new();

        let tolerant = run(&config, &teachers, &subjects, &classrooms, EngineSettings::default());
        assert_eq!(tolerant.timetable.assigned_slots(), 3);
        assert_eq!(tolerant.unassigned.len(), 1);

        let strict = run(&config, &teachers, &subjects, &classrooms, strict());
        assert_eq!(strict.timetable.assigned_slots(), 4);
        assert_eq!(strict.backtracks, 1);
        assert!(!strict.degraded);
        assert!(strict.timetable.grid[0][0][1].is_taught_by("T1"));
        assert!(strict.timetable.grid[0][1][0].is_taught_by("T1"));
        for c in &strict.candidates {
            assert!(c.assigned_hours() <= c.required_hours);
        }
    }

    #[test]
    fn test_strict_degrades_on_limit() {
        let config = single_class(3);
        let teachers = vec![Teacher::new("T1").with_subject("math").with_max_weekly_hours(1)];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 3)];
        let settings = EngineSettings {
            backtrack_limit: 2,
            ..strict()
        };
        let out = run(&config, &teachers, &subjects, &[], settings);

        assert!(out.degraded);
        assert!(out.backtracks <= 2);
        assert_eq!(out.timetable.assigned_slots(), 1);
    }

    #[test]
    fn test_custom_rules() {
        use crate::dispatching::{rules, TieBreaker};

        let config = single_class(2);
        let teachers = vec![
            Teacher::new("T2").with_subject("math"),
            Teacher::new("T1").with_subject("art"),
        ];
        let subjects = vec![
            Subject::new("math").with_weekly_hours(1, 1),
            Subject::new("art").with_weekly_hours(1, 1),
        ];
        let engine = RuleEngine::new()
            .with_rule(rules::ScarceSubject)
            .with_final_tie_breaker(TieBreaker::ByKey);
        let out = AssignmentEngine::new(&config, &teachers, &subjects, &[], EngineSettings::default())
            .unwrap()
            .with_rules(engine)
            .run()
            .unwrap();

        // equal scarcity, so teacher ID decides
        assert!(out.timetable.grid[0][0][0].is_taught_by("T1"));
        assert!(out.timetable.grid[0][1][0].is_taught_by("T2"));
    }

    #[test]
    fn test_cancelled_run() {
        let config = single_class(2);
        let teachers = vec![Teacher::new("T1").with_subject("math")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
        let flag = Arc::new(AtomicBool::new(true));
        let result = AssignmentEngine::new(&config, &teachers, &subjects, &[], EngineSettings::default())
            .unwrap()
            .with_cancel_flag(flag)
            .run();
        assert!(matches!(result, Err(TimetableError::Cancelled)));
    }
}
