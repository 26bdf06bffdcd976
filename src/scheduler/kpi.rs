//! Timetable quality metrics.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assigned slots | Slots with both teacher and subject set |
//! | Assignment rate | assigned / total × 100, 2 decimals |
//! | Constraint violations | Sum of per-slot violation flags |
//! | Quality score | max(0, rate − min(violations × 5, 30)) |
//! | Difficulty | required hours / available hours × 100 |
//! | Teacher utilization | Fraction of teachers with at least one slot |

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{AssignmentCandidate, Teacher, Timetable};

/// Penalty per violation, in rate points.
pub const VIOLATION_PENALTY: f64 = 5.0;
/// Cap on the total violation penalty.
pub const MAX_VIOLATION_PENALTY: f64 = 30.0;

/// Rounds to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Grid-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableStatistics {
    /// Number of slots in the grid.
    pub total_slots: usize,
    /// Slots with teacher and subject set.
    pub assigned_slots: usize,
    /// `total_slots - assigned_slots`.
    pub unassigned_slots: usize,
    /// Sum of per-slot violation flags.
    pub constraint_violations: usize,
    /// Percentage of slots filled (0..=100, 2 decimals).
    pub assignment_rate: f64,
    /// Assignment rate penalized by violations (0..=100, 2 decimals).
    pub quality_score: f64,
}

impl TimetableStatistics {
    /// Computes statistics from a grid.
    pub fn calculate(grid: &Timetable) -> Self {
        let total_slots = grid.total_slots();
        let assigned_slots = grid.assigned_slots();
        let constraint_violations = grid.violation_count();

        let assignment_rate = if total_slots == 0 {
            0.0
        } else {
            round2(assigned_slots as f64 / total_slots as f64 * 100.0)
        };
        let penalty = (constraint_violations as f64 * VIOLATION_PENALTY).min(MAX_VIOLATION_PENALTY);
        let quality_score = round2((assignment_rate - penalty).max(0.0));

        Self {
            total_slots,
            assigned_slots,
            unassigned_slots: total_slots - assigned_slots,
            constraint_violations,
            assignment_rate,
            quality_score,
        }
    }

    /// Whether every slot was filled.
    pub fn is_complete(&self) -> bool {
        self.total_slots > 0 && self.unassigned_slots == 0
    }
}

/// Computes grid statistics. Stateless and read-only.
pub fn analyze(grid: &Timetable) -> TimetableStatistics {
    TimetableStatistics::calculate(grid)
}

/// Workload of one teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLoad {
    /// Teacher ID.
    pub teacher_id: String,
    /// Teacher name.
    pub name: String,
    /// Sum of required hours over the teacher's candidates.
    pub required_hours: u32,
    /// Hours actually placed.
    pub assigned_hours: u32,
    /// Weekly cap (default 30).
    pub available_hours: u32,
    /// round(required / available × 100).
    pub difficulty_percentage: u32,
}

impl TeacherLoad {
    /// Whether the teacher is asked for more than they can give.
    pub fn is_overloaded(&self) -> bool {
        self.required_hours > self.available_hours
    }
}

/// Per-teacher load, in roster order.
pub fn teacher_loads(teachers: &[Teacher], candidates: &[AssignmentCandidate]) -> Vec<TeacherLoad> {
    teachers
        .iter()
        .map(|t| {
            let (required, assigned) = candidates
                .iter()
                .filter(|c| c.teacher_id == t.id)
                .fold((0, 0), |(r, a), c| (r + c.required_hours, a + c.assigned_hours()));
            let available = t.available_hours();
            let difficulty = (required as f64 / available.max(1) as f64 * 100.0).round() as u32;
            TeacherLoad {
                teacher_id: t.id.clone(),
                name: t.name.clone(),
                required_hours: required,
                assigned_hours: assigned,
                available_hours: available,
                difficulty_percentage: difficulty,
            }
        })
        .collect()
}

/// Fraction (0..=1) of teachers holding at least one slot.
pub fn teacher_utilization_rate(grid: &Timetable, teachers: &[Teacher]) -> f64 {
    if teachers.is_empty() {
        return 0.0;
    }
    let busy: HashSet<&str> = grid.slots().filter_map(|s| s.teacher_id.as_deref()).collect();
    let used = teachers.iter().filter(|t| busy.contains(t.id.as_str())).count();
    used as f64 / teachers.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SchoolConfiguration, SlotAssignment, SlotViolation, SlotViolationKind};
    use crate::scheduler::build_grid;

    fn grid(periods: u32) -> Timetable {
        build_grid(&SchoolConfiguration::new(["Mon"], periods).with_grade(1, ["A"])).unwrap()
    }

    fn assign(grid: &mut Timetable, period: usize, teacher: &str, violations: usize) {
        let flags = (0..violations)
            .map(|_| SlotViolation {
                kind: SlotViolationKind::RecommendedRestriction,
                teacher_id: teacher.into(),
                message: String::new(),
            })
            .collect();
        grid.grid[0][period][0].assign(
            SlotAssignment {
                teacher_id: teacher.into(),
                subject_id: "math".into(),
                classroom_id: None,
            },
            flags,
        );
    }

    #[test]
    fn test_statistics_basic() {
        let mut g = grid(3);
        assign(&mut g, 0, "T1", 0);
        let s = analyze(&g);

        assert_eq!(s.total_slots, 3);
        assert_eq!(s.assigned_slots, 1);
        assert_eq!(s.unassigned_slots, 2);
        assert!((s.assignment_rate - 33.33).abs() < 1e-10);
        assert!((s.quality_score - 33.33).abs() < 1e-10);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_quality_penalty_capped() {
        let mut g = grid(2);
        assign(&mut g, 0, "T1", 4);
        assign(&mut g, 1, "T2", 4);
        let s = analyze(&g);

        assert_eq!(s.constraint_violations, 8);
        assert!((s.assignment_rate - 100.0).abs() < 1e-10);
        assert!((s.quality_score - 70.0).abs() < 1e-10);
    }

    #[test]
    fn test_quality_never_negative() {
        let mut g = grid(10);
        assign(&mut g, 0, "T1", 3);
        let s = analyze(&g);
        assert!((s.assignment_rate - 10.0).abs() < 1e-10);
        assert!((s.quality_score - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_grid() {
        let s = analyze(&Timetable::default());
        assert_eq!(s.total_slots, 0);
        assert!((s.assignment_rate - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_teacher_loads() {
        let teachers = vec![
            Teacher::new("T1").with_max_weekly_hours(10),
            Teacher::new("T2"),
        ];
        let mut a = AssignmentCandidate::new("T1", "math", 1, "A", 4);
        a.record_placement();
        let candidates = vec![
            a,
            AssignmentCandidate::new("T1", "math", 1, "B", 4),
            AssignmentCandidate::new("T2", "art", 1, "A", 9),
        ];
        let loads = teacher_loads(&teachers, &candidates);

        assert_eq!(loads[0].required_hours, 8);
        assert_eq!(loads[0].assigned_hours, 1);
        assert_eq!(loads[0].difficulty_percentage, 80);
        assert_eq!(loads[1].available_hours, 30);
        assert_eq!(loads[1].difficulty_percentage, 30);
        assert!(!loads[1].is_overloaded());
    }

    #[test]
    fn test_teacher_utilization() {
        let mut g = grid(2);
        assign(&mut g, 0, "T1", 0);
        let teachers = vec![Teacher::new("T1"), Teacher::new("T2")];
        assert!((teacher_utilization_rate(&g, &teachers) - 0.5).abs() < 1e-10);
        assert!((teacher_utilization_rate(&g, &[]) - 0.0).abs() < 1e-10);
    }
}
