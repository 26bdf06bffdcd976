//! Retry controller: independent attempts, best-of-N.
//!
//! Every attempt builds a fresh [`AssignmentEngine`]. Attempt 1 uses the
//! stable candidate order; attempt `n > 1` shuffles ties with the seed
//! `seed + n`, so a whole run is reproducible from its seed.
//!
//! Sequential mode stops at the first attempt reaching the quality
//! threshold. Parallel mode runs every attempt on the rayon pool, then
//! folds the results in attempt order with the same stopping rule, so both
//! modes pick the same attempt for a given seed. Cancelled attempts are
//! dropped from the fold; any attempt that finished still competes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::engine::{AssignmentEngine, EngineOutcome, EngineSettings};
use super::kpi::{round2, teacher_loads, teacher_utilization_rate, TeacherLoad, TimetableStatistics};
use crate::dispatching::TieOrder;
use crate::error::{Result, TimetableError};
use crate::models::{AssignmentCandidate, Classroom, SchoolConfiguration, Subject, Teacher, Timetable};
use crate::options::GenerateOptions;
use crate::validation::validate_roster;

/// Statistics of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatistics {
    /// Grid statistics of the returned timetable.
    #[serde(flatten)]
    pub timetable: TimetableStatistics,
    /// Attempts consumed.
    pub retry_attempts: u32,
    /// Assignment rate of the returned timetable.
    pub best_assignment_rate: f64,
    /// Best rate after each consumed attempt (non-decreasing).
    pub best_rate_history: Vec<f64>,
    /// Human-readable verdict.
    pub quality_message: String,
    /// Whether the quality threshold was reached.
    pub complete: bool,
    /// Seed used for shuffled attempts.
    pub seed: u64,
    /// Backtracks performed by the returned attempt.
    pub backtracks: usize,
    /// Whether the returned attempt fell back to tolerant mode.
    pub degraded: bool,
    /// Candidates left with missing hours.
    pub unassigned_requirements: usize,
    /// Per-teacher workload.
    pub teacher_loads: Vec<TeacherLoad>,
    /// Fraction of teachers holding at least one slot.
    pub teacher_utilization_rate: f64,
    /// Roster issues found before generation.
    pub roster_warnings: Vec<String>,
    /// Whether the run was cut short by cancellation.
    pub cancelled: bool,
    /// Wall-clock time of the whole run.
    pub elapsed_ms: u64,
}

/// Output of [`RetryController::run`].
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Best timetable found.
    pub timetable: Timetable,
    /// Run statistics.
    pub statistics: GenerationStatistics,
    /// Candidates of the best attempt, with final assigned hours.
    pub candidates: Vec<AssignmentCandidate>,
}

/// One finished attempt.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Engine output.
    pub outcome: EngineOutcome,
    /// Grid statistics.
    pub statistics: TimetableStatistics,
    /// Whether the attempt reached the quality threshold.
    pub success: bool,
}

/// Quality verdict for an assignment rate.
pub fn quality_message(rate: f64, options: &GenerateOptions) -> String {
    if rate >= options.quality_threshold {
        format!("Complete timetable generated ({rate:.2}% of slots assigned)")
    } else if rate >= options.good_quality_threshold {
        format!("Good timetable ({rate:.2}% of slots assigned), minor review suggested")
    } else {
        format!("Partial timetable ({rate:.2}% of slots assigned), manual adjustment recommended")
    }
}

/// Runs the assignment engine several times and keeps the best attempt.
///
/// # Example
///
/// ```
/// use u_timetable::models::{SchoolConfiguration, Subject, Teacher};
/// use u_timetable::options::GenerateOptions;
/// use u_timetable::scheduler::RetryController;
///
/// let config = SchoolConfiguration::new(["Mon"], 2).with_grade(1, ["A"]);
/// let teachers = vec![Teacher::new("T1").with_subject("math")];
/// let subjects = vec![Subject::new("math").with_weekly_hours(1, 3)];
/// let options = GenerateOptions::default().with_seed(7);
///
/// let result = RetryController::new(&config, &teachers, &subjects, &[], &options)
///     .run()
///     .unwrap();
/// assert_eq!(result.statistics.retry_attempts, 1);
/// assert!((result.statistics.best_assignment_rate - 100.0).abs() < 1e-10);
/// assert_eq!(result.statistics.unassigned_requirements, 1);
/// ```
pub struct RetryController<'a> {
    config: &'a SchoolConfiguration,
    teachers: &'a [Teacher],
    subjects: &'a [Subject],
    classrooms: &'a [Classroom],
    options: &'a GenerateOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> RetryController<'a> {
    /// Creates a controller over the given roster.
    pub fn new(
        config: &'a SchoolConfiguration,
        teachers: &'a [Teacher],
        subjects: &'a [Subject],
        classrooms: &'a [Classroom],
        options: &'a GenerateOptions,
    ) -> Self {
        Self {
            config,
            teachers,
            subjects,
            classrooms,
            options,
            cancel: None,
        }
    }

    /// Sets a flag that cancels the run when raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs all attempts and returns the best one.
    ///
    /// # Errors
    /// - [`TimetableError::InvalidConfiguration`] for an unusable configuration.
    /// - [`TimetableError::Cancelled`] if cancelled before any attempt finished.
    pub fn run(&self) -> Result<GenerationResult> {
        self.config.check()?;
        let started = Instant::now();
        let seed = self.options.seed.unwrap_or_else(rand::random);
        let attempts = self.options.attempts();

        info!(
            event = "generate_start",
            teachers = self.teachers.len(),
            subjects = self.subjects.len(),
            classrooms = self.classrooms.len(),
            slots = self.config.slot_count(),
            attempts,
            seed,
            tolerant = self.options.tolerant_mode,
            parallel = self.options.parallel,
        );

        let roster_warnings: Vec<String> = match validate_roster(self.teachers, self.subjects, self.classrooms) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_iter().map(|e| e.message).collect(),
        };
        for w in &roster_warnings {
            warn!(issue = %w, "roster issue");
        }

        let mut fold = BestFold::new(self.options.quality_threshold);
        if self.options.parallel {
            let results: Vec<Result<GenerationAttempt>> = (1..=attempts)
                .into_par_iter()
                .map(|n| self.run_attempt(n, seed))
                .collect();
            for result in results {
                if fold.push(result)? {
                    break;
                }
            }
        } else {
            for n in 1..=attempts {
                if fold.push(self.run_attempt(n, seed))? || fold.cancelled {
                    break;
                }
            }
        }

        self.finish(fold, seed, roster_warnings, started)
    }

    /// Turns the folded attempts into the run result.
    fn finish(
        &self,
        fold: BestFold,
        seed: u64,
        roster_warnings: Vec<String>,
        started: Instant,
    ) -> Result<GenerationResult> {
        let BestFold {
            best,
            history,
            cancelled,
            ..
        } = fold;
        let Some(best) = best else {
            warn!("generation cancelled before any attempt finished");
            return Err(TimetableError::Cancelled);
        };

        let rate = best.statistics.assignment_rate;
        let complete = rate >= self.options.quality_threshold;
        if !complete && !cancelled {
            warn!(
                best_rate = rate,
                threshold = self.options.quality_threshold,
                attempts = history.len(),
                "retries exhausted below quality threshold"
            );
        }

        let candidates = best.outcome.candidates;
        let timetable = best.outcome.timetable;
        let statistics = GenerationStatistics {
            timetable: best.statistics,
            retry_attempts: history.len() as u32,
            best_assignment_rate: rate,
            quality_message: quality_message(rate, self.options),
            best_rate_history: history,
            complete,
            seed,
            backtracks: best.outcome.backtracks,
            degraded: best.outcome.degraded,
            unassigned_requirements: candidates.iter().filter(|c| !c.is_satisfied()).count(),
            teacher_loads: teacher_loads(self.teachers, &candidates),
            teacher_utilization_rate: round2(teacher_utilization_rate(&timetable, self.teachers)),
            roster_warnings,
            cancelled,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            event = "generate_finish",
            attempts = statistics.retry_attempts,
            best_attempt = best.attempt,
            assignment_rate = rate,
            quality_score = statistics.timetable.quality_score,
            violations = statistics.timetable.constraint_violations,
            cancelled,
            elapsed_ms = statistics.elapsed_ms,
        );

        Ok(GenerationResult {
            timetable,
            statistics,
            candidates,
        })
    }

    fn run_attempt(&self, attempt: u32, seed: u64) -> Result<GenerationAttempt> {
        if self.is_cancelled() {
            return Err(TimetableError::Cancelled);
        }
        let order = if attempt <= 1 {
            TieOrder::Stable
        } else {
            TieOrder::Shuffled(seed.wrapping_add(u64::from(attempt)))
        };
        let settings = EngineSettings::from_options(self.options, order);
        let mut engine = AssignmentEngine::new(
            self.config,
            self.teachers,
            self.subjects,
            self.classrooms,
            settings,
        )?;
        if let Some(flag) = &self.cancel {
            engine = engine.with_cancel_flag(Arc::clone(flag));
        }

        let outcome = engine.run()?;
        let statistics = TimetableStatistics::calculate(&outcome.timetable);
        let success = statistics.assignment_rate >= self.options.quality_threshold;
        debug!(
            attempt,
            assignment_rate = statistics.assignment_rate,
            unassigned = outcome.unassigned.len(),
            backtracks = outcome.backtracks,
            success,
            "attempt finished"
        );

        Ok(GenerationAttempt {
            attempt,
            outcome,
            statistics,
            success,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Max-by-rate reduction over attempts in attempt order.
struct BestFold {
    threshold: f64,
    best: Option<GenerationAttempt>,
    history: Vec<f64>,
    cancelled: bool,
}

impl BestFold {
    fn new(threshold: f64) -> Self {
        Self {
            threshold,
            best: None,
            history: Vec::new(),
            cancelled: false,
        }
    }

    /// Folds one result. Returns `Ok(true)` once the threshold is reached.
    /// A cancelled attempt only sets the `cancelled` flag; later finished
    /// attempts still count.
    fn push(&mut self, result: Result<GenerationAttempt>) -> Result<bool> {
        let attempt = match result {
            Ok(a) => a,
            Err(TimetableError::Cancelled) => {
                self.cancelled = true;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let improves = self
            .best
            .as_ref()
            .map_or(true, |b| attempt.statistics.assignment_rate > b.statistics.assignment_rate);
        if improves {
            self.best = Some(attempt);
        }
        let best_rate = self
            .best
            .as_ref()
            .map_or(0.0, |b| b.statistics.assignment_rate);
        self.history.push(best_rate);
        Ok(best_rate >= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two classes share three teachers; most placements collide.
    fn roster() -> (SchoolConfiguration, Vec<Teacher>, Vec<Subject>) {
        let config = SchoolConfiguration::new(["Mon", "Tue"], 3).with_grade(1, ["A", "B", "C"]);
        let teachers = vec![
            Teacher::new("T1").with_subject("math").with_subject("sci"),
            Teacher::new("T2").with_subject("kor"),
            Teacher::new("T3").with_subject("sci").with_max_weekly_hours(2),
        ];
        let subjects = vec![
            Subject::new("math").with_weekly_hours(1, 3),
            Subject::new("kor").with_weekly_hours(1, 2),
            Subject::new("sci").with_weekly_hours(1, 1),
        ];
        (config, teachers, subjects)
    }

    #[test]
    fn test_short_circuit_on_complete() {
        let config = SchoolConfiguration::new(["Mon"], 2).with_grade(1, ["A"]);
        let teachers = vec![Teacher::new("T1").with_subject("math")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
        let options = GenerateOptions::default().with_max_retries(5).with_seed(1);
        let result = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .run()
            .unwrap();

        assert_eq!(result.statistics.retry_attempts, 1);
        assert!(result.statistics.complete);
        assert!(result.statistics.quality_message.starts_with("Complete"));
        assert_eq!(result.statistics.best_rate_history, vec![100.0]);
    }

    #[test]
    fn test_exhausts_retries_with_monotone_history() {
        let (config, teachers, subjects) = roster();
        let options = GenerateOptions::default().with_max_retries(4).with_seed(42);
        let result = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .run()
            .unwrap();
        let stats = &result.statistics;

        assert_eq!(stats.retry_attempts, 4);
        assert!(!stats.complete);
        assert!(stats.best_rate_history.windows(2).all(|w| w[0] <= w[1]));
        let last = stats.best_rate_history.last().copied().unwrap();
        assert!((last - stats.best_assignment_rate).abs() < 1e-10);
        assert!((stats.timetable.assignment_rate - stats.best_assignment_rate).abs() < 1e-10);
        assert_eq!(stats.seed, 42);
    }

    #[test]
    fn test_reproducible_per_seed() {
        let (config, teachers, subjects) = roster();
        let options = GenerateOptions::default().with_max_retries(3).with_seed(9);
        let a = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .run()
            .unwrap();
        let b = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .run()
            .unwrap();
        assert_eq!(a.timetable, b.timetable);
        assert_eq!(a.statistics.best_rate_history, b.statistics.best_rate_history);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (config, teachers, subjects) = roster();
        let sequential = GenerateOptions::default().with_max_retries(3).with_seed(5);
        let parallel = sequential.clone().with_parallel(true);
        let a = RetryController::new(&config, &teachers, &subjects, &[], &sequential)
            .run()
            .unwrap();
        let b = RetryController::new(&config, &teachers, &subjects, &[], &parallel)
            .run()
            .unwrap();
        assert_eq!(a.timetable, b.timetable);
        assert_eq!(a.statistics.retry_attempts, b.statistics.retry_attempts);
    }

    #[test]
    fn test_cancelled_before_start() {
        let (config, teachers, subjects) = roster();
        let options = GenerateOptions::default();
        let flag = Arc::new(AtomicBool::new(true));
        let result = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .with_cancel_flag(flag)
            .run();
        assert!(matches!(result, Err(TimetableError::Cancelled)));
    }

    #[test]
    fn test_invalid_configuration() {
        let config = SchoolConfiguration::new(["Mon"], 2);
        let options = GenerateOptions::default();
        let result = RetryController::new(&config, &[], &[], &[], &options).run();
        assert!(matches!(result, Err(TimetableError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_roster_warnings_reported() {
        let config = SchoolConfiguration::new(["Mon"], 1).with_grade(1, ["A"]);
        let teachers = vec![Teacher::new("T1").with_subject("math").with_subject("ghost")];
        let subjects = vec![Subject::new("math").with_weekly_hours(1, 1)];
        let options = GenerateOptions::default().with_seed(3);
        let result = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .run()
            .unwrap();
        assert_eq!(result.statistics.roster_warnings.len(), 1);
        assert_eq!(result.statistics.timetable.assigned_slots, 1);
    }

    #[test]
    fn test_quality_messages() {
        let options = GenerateOptions::default();
        assert!(quality_message(99.5, &options).starts_with("Complete"));
        assert!(quality_message(92.0, &options).starts_with("Good"));
        assert!(quality_message(50.0, &options).starts_with("Partial"));
    }

    #[test]
    fn test_cancelled_between_attempts_keeps_finished_one() {
        let (config, teachers, subjects) = roster();
        let options = GenerateOptions::default().with_max_retries(3).with_seed(11);
        let flag = Arc::new(AtomicBool::new(false));
        let controller = RetryController::new(&config, &teachers, &subjects, &[], &options)
            .with_cancel_flag(Arc::clone(&flag));

        let mut fold = BestFold::new(options.quality_threshold);
        let first = controller.run_attempt(1, 11);
        assert!(first.is_ok());
        assert!(!fold.push(first).unwrap());

        flag.store(true, Ordering::Relaxed);
        let second = controller.run_attempt(2, 11);
        assert!(matches!(second, Err(TimetableError::Cancelled)));
        assert!(!fold.push(second).unwrap());

        let result = controller
            .finish(fold, 11, Vec::new(), Instant::now())
            .unwrap();
        assert!(result.statistics.cancelled);
        assert_eq!(result.statistics.retry_attempts, 1);
        assert_eq!(result.statistics.best_rate_history.len(), 1);
        assert!(!result.statistics.complete);
        assert!(result.timetable.assigned_slots() > 0);
    }

    #[test]
    fn test_cancelled_attempt_does_not_hide_later_one() {
        let (config, teachers, subjects) = roster();
        let options = GenerateOptions::default().with_max_retries(2).with_seed(4);
        let controller = RetryController::new(&config, &teachers, &subjects, &[], &options);
        let later = controller.run_attempt(2, 4).unwrap();
        let later_rate = later.statistics.assignment_rate;

        let mut fold = BestFold::new(options.quality_threshold);
        fold.push(Err(TimetableError::Cancelled)).unwrap();
        fold.push(Ok(later)).unwrap();

        assert!(fold.cancelled);
        assert_eq!(fold.history.len(), 1);
        let best = fold.best.as_ref().map(|b| b.attempt);
        assert_eq!(best, Some(2));
        assert!((fold.history[0] - later_rate).abs() < 1e-10);
    }

    #[test]
    fn test_other_errors_propagate_through_fold() {
        let mut fold = BestFold::new(99.0);
        let result = fold.push(Err(TimetableError::InvalidConfiguration("bad".into())));
        assert!(matches!(result, Err(TimetableError::InvalidConfiguration(_))));
        assert!(!fold.cancelled);
    }
}
