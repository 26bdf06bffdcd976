//! Independent audit of a finished timetable.
//!
//! Re-derives every conflict from the grid and the roster alone, without
//! trusting the engine's bookkeeping. Works on any grid, including one
//! supplied from outside.
//!
//! # Severity
//!
//! | Severity | Findings |
//! |----------|----------|
//! | Critical | Double-booked teacher or classroom, room type over capacity, unqualified teacher, grade mismatch, unknown IDs |
//! | Major | Mandatory restriction broken |
//! | Minor | Recommended restriction broken, subject taught more than its weekly hours |
//!
//! `overall_score = clamp(assignment_rate − critical × 20 − major × 10, 0, 100)`

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    Classroom, Grade, RestrictionLevel, Subject, Teacher, Timetable, TimetableSlot,
};
use crate::scheduler::{analyze, generate_candidates, round2, TimetableStatistics};

/// Score deducted per critical violation.
pub const CRITICAL_PENALTY: f64 = 20.0;
/// Score deducted per major violation.
pub const MAJOR_PENALTY: f64 = 10.0;

/// Violation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Hard-constraint conflict.
    Critical,
    /// Mandatory restriction broken.
    Major,
    /// Soft preference broken.
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        };
        f.write_str(s)
    }
}

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// A teacher holds two slots at the same time.
    TeacherDoubleBooked,
    /// A classroom hosts two slots at the same time.
    ClassroomDoubleBooked,
    /// More concurrent uses of a room type than rooms of that type.
    ClassroomCapacityExceeded,
    /// The teacher does not teach the subject.
    UnqualifiedTeacher,
    /// The subject or teacher does not cover the slot's grade.
    GradeNotApplicable,
    /// Teacher, subject, or classroom ID not in the roster.
    UnknownReference,
    /// A mandatory restriction forbids the placement.
    MandatoryRestriction,
    /// A recommended restriction discourages the placement.
    RecommendedRestriction,
    /// A class gets more hours of a subject than required.
    ExcessSubjectHours,
}

impl ViolationKind {
    /// Severity of this kind of finding.
    pub fn severity(self) -> Severity {
        match self {
            Self::TeacherDoubleBooked
            | Self::ClassroomDoubleBooked
            | Self::ClassroomCapacityExceeded
            | Self::UnqualifiedTeacher
            | Self::GradeNotApplicable
            | Self::UnknownReference => Severity::Critical,
            Self::MandatoryRestriction => Severity::Major,
            Self::RecommendedRestriction | Self::ExcessSubjectHours => Severity::Minor,
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Severity.
    pub severity: Severity,
    /// Category.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
    /// Day, when the finding is tied to a time.
    pub day: Option<String>,
    /// Period, when the finding is tied to a time.
    pub period: Option<u32>,
    /// Grade, when the finding is tied to a class.
    pub grade: Option<Grade>,
    /// Section, when the finding is tied to a class.
    pub section: Option<String>,
    /// Teacher involved, if any.
    pub teacher_id: Option<String>,
}

impl Violation {
    fn new(kind: ViolationKind, message: String) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message,
            day: None,
            period: None,
            grade: None,
            section: None,
            teacher_id: None,
        }
    }

    fn at_time(mut self, slot: &TimetableSlot) -> Self {
        self.day = Some(slot.day.clone());
        self.period = Some(slot.period);
        self
    }

    fn at_slot(mut self, slot: &TimetableSlot) -> Self {
        self.grade = Some(slot.grade);
        self.section = Some(slot.section.clone());
        self.teacher_id.clone_from(&slot.teacher_id);
        self.at_time(slot)
    }

    fn for_teacher(mut self, teacher_id: &str) -> Self {
        self.teacher_id = Some(teacher_id.to_string());
        self
    }
}

/// A candidate whose hours were not all placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedRequirement {
    /// Teacher ID.
    pub teacher_id: String,
    /// Subject ID.
    pub subject_id: String,
    /// Grade.
    pub grade: Grade,
    /// Section.
    pub section: String,
    /// Weekly hours required.
    pub required_hours: u32,
    /// Hours found in the grid (at most `required_hours`).
    pub assigned_hours: u32,
    /// `required_hours - assigned_hours`.
    pub missing_hours: u32,
}

/// Result of [`validate_timetable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// No violations at all.
    pub is_valid: bool,
    /// Completion rate minus penalties, 0..=100.
    pub overall_score: f64,
    /// All findings.
    pub violations: Vec<Violation>,
    /// Grid statistics.
    pub quality_metrics: TimetableStatistics,
    /// Candidates with missing hours.
    pub unassigned_requirements: Vec<UnassignedRequirement>,
    /// Suggested follow-ups.
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// Number of findings with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    /// Number of critical findings.
    pub fn critical_count(&self) -> usize {
        self.count(Severity::Critical)
    }

    /// Number of major findings.
    pub fn major_count(&self) -> usize {
        self.count(Severity::Major)
    }

    /// Number of minor findings.
    pub fn minor_count(&self) -> usize {
        self.count(Severity::Minor)
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Total missing hours over all unassigned requirements.
    pub fn missing_hours(&self) -> u32 {
        self.unassigned_requirements.iter().map(|u| u.missing_hours).sum()
    }
}

/// Audits a timetable against the roster.
///
/// # Example
///
/// ```
/// use u_timetable::models::{SchoolConfiguration, SlotAssignment, Subject, Teacher};
/// use u_timetable::scheduler::build_grid;
/// use u_timetable::validation::validate_timetable;
///
/// let config = SchoolConfiguration::new(["Mon"], 2).with_grade(1, ["A"]);
/// let teachers = vec![Teacher::new("T1").with_subject("math")];
/// let subjects = vec![Subject::new("math").with_weekly_hours(1, 2)];
/// let mut grid = build_grid(&config).unwrap();
/// grid.grid[0][0][0].assign(
///     SlotAssignment { teacher_id: "T1".into(), subject_id: "math".into(), classroom_id: None },
///     Vec::new(),
/// );
///
/// let report = validate_timetable(&grid, &teachers, &subjects, &[]);
/// assert!(report.is_valid);
/// assert_eq!(report.unassigned_requirements[0].missing_hours, 1);
/// assert!((report.overall_score - 50.0).abs() < 1e-10);
/// ```
pub fn validate_timetable(
    grid: &Timetable,
    teachers: &[Teacher],
    subjects: &[Subject],
    classrooms: &[Classroom],
) -> ValidationReport {
    let teacher_map: HashMap<&str, &Teacher> = teachers.iter().map(|t| (t.id.as_str(), t)).collect();
    let subject_map: HashMap<&str, &Subject> = subjects.iter().map(|s| (s.id.as_str(), s)).collect();
    let room_map: HashMap<&str, &Classroom> = classrooms.iter().map(|c| (c.id.as_str(), c)).collect();
    let mut rooms_per_type: HashMap<&str, usize> = HashMap::new();
    for c in classrooms {
        *rooms_per_type.entry(c.classroom_type.as_str()).or_default() += 1;
    }

    let mut violations = Vec::new();

    for periods in &grid.grid {
        for slots in periods {
            check_concurrency(slots, &subject_map, &rooms_per_type, &mut violations);
        }
    }

    for slot in grid.slots().filter(|s| s.is_assigned()) {
        check_slot(slot, &teacher_map, &subject_map, &room_map, &mut violations);
    }

    check_subject_hours(grid, &subject_map, &mut violations);

    let unassigned_requirements = unassigned_requirements(grid, teachers, subjects);
    let quality_metrics = analyze(grid);

    let critical = violations.iter().filter(|v| v.severity == Severity::Critical).count();
    let major = violations.iter().filter(|v| v.severity == Severity::Major).count();
    let overall_score = round2(
        (quality_metrics.assignment_rate
            - critical as f64 * CRITICAL_PENALTY
            - major as f64 * MAJOR_PENALTY)
            .clamp(0.0, 100.0),
    );

    let suggestions = suggestions(&violations, &unassigned_requirements, &quality_metrics);

    ValidationReport {
        is_valid: violations.is_empty(),
        overall_score,
        violations,
        quality_metrics,
        unassigned_requirements,
        suggestions,
    }
}

/// Conflicts among the slots of one (day, period).
fn check_concurrency(
    slots: &[TimetableSlot],
    subjects: &HashMap<&str, &Subject>,
    rooms_per_type: &HashMap<&str, usize>,
    out: &mut Vec<Violation>,
) {
    let Some(first) = slots.first() else {
        return;
    };

    let mut by_teacher: BTreeMap<&str, Vec<&TimetableSlot>> = BTreeMap::new();
    let mut by_room: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for slot in slots {
        if let Some(t) = slot.teacher_id.as_deref() {
            by_teacher.entry(t).or_default().push(slot);
        }
        if let Some(r) = slot.classroom_id.as_deref() {
            *by_room.entry(r).or_default() += 1;
        }
        let room_type = slot
            .subject_id
            .as_deref()
            .and_then(|id| subjects.get(id))
            .and_then(|s| s.required_room_type());
        if let Some(kind) = room_type {
            *by_type.entry(kind).or_default() += 1;
        }
    }

    for (teacher, held) in by_teacher.into_iter().filter(|(_, h)| h.len() > 1) {
        let classes: Vec<String> = held.iter().map(|s| s.class_ref().to_string()).collect();
        out.push(
            Violation::new(
                ViolationKind::TeacherDoubleBooked,
                format!(
                    "Teacher {teacher} is booked for {} classes at {} period {} ({})",
                    held.len(),
                    first.day,
                    first.period,
                    classes.join(", ")
                ),
            )
            .at_time(first)
            .for_teacher(teacher),
        );
    }

    for (room, uses) in by_room.into_iter().filter(|(_, n)| *n > 1) {
        out.push(
            Violation::new(
                ViolationKind::ClassroomDoubleBooked,
                format!(
                    "Classroom {room} hosts {uses} classes at {} period {}",
                    first.day, first.period
                ),
            )
            .at_time(first),
        );
    }

    for (kind, uses) in by_type {
        let available = rooms_per_type.get(kind).copied().unwrap_or(0);
        if uses > available {
            out.push(
                Violation::new(
                    ViolationKind::ClassroomCapacityExceeded,
                    format!(
                        "{uses} classes need a {kind} room at {} period {} but only {available} exist",
                        first.day, first.period
                    ),
                )
                .at_time(first),
            );
        }
    }
}

/// Roster consistency of one assigned slot.
fn check_slot(
    slot: &TimetableSlot,
    teachers: &HashMap<&str, &Teacher>,
    subjects: &HashMap<&str, &Subject>,
    rooms: &HashMap<&str, &Classroom>,
    out: &mut Vec<Violation>,
) {
    let (Some(teacher_id), Some(subject_id)) = (slot.teacher_id.as_deref(), slot.subject_id.as_deref())
    else {
        return;
    };
    let at = format!("{} at {} period {}", slot.class_ref(), slot.day, slot.period);

    if let Some(room_id) = slot.classroom_id.as_deref() {
        if !rooms.contains_key(room_id) {
            out.push(
                Violation::new(
                    ViolationKind::UnknownReference,
                    format!("Unknown classroom {room_id} in {at}"),
                )
                .at_slot(slot),
            );
        }
    }

    let (teacher, subject) = match (teachers.get(teacher_id), subjects.get(subject_id)) {
        (Some(t), Some(s)) => (*t, *s),
        (t, s) => {
            let missing = match (t, s) {
                (None, None) => format!("teacher {teacher_id} and subject {subject_id}"),
                (None, _) => format!("teacher {teacher_id}"),
                _ => format!("subject {subject_id}"),
            };
            out.push(
                Violation::new(ViolationKind::UnknownReference, format!("Unknown {missing} in {at}"))
                    .at_slot(slot),
            );
            return;
        }
    };

    if !teacher.teaches(subject_id) {
        out.push(
            Violation::new(
                ViolationKind::UnqualifiedTeacher,
                format!("Teacher {teacher_id} does not teach {subject_id} ({at})"),
            )
            .at_slot(slot),
        );
    }
    if !subject.applies_to(slot.grade) || !teacher.may_teach_grade(slot.grade) {
        out.push(
            Violation::new(
                ViolationKind::GradeNotApplicable,
                format!("{subject_id} by {teacher_id} is not applicable to grade {} ({at})", slot.grade),
            )
            .at_slot(slot),
        );
    }

    for r in teacher.blocking_restrictions(subject_id, slot.grade, &slot.section, &slot.day, slot.period) {
        let (kind, label) = match r.level {
            RestrictionLevel::Mandatory => (ViolationKind::MandatoryRestriction, "mandatory"),
            RestrictionLevel::Recommended => (ViolationKind::RecommendedRestriction, "recommended"),
        };
        out.push(
            Violation::new(
                kind,
                format!("Teacher {teacher_id} breaks a {label} restriction teaching {subject_id} ({at})"),
            )
            .at_slot(slot),
        );
    }
}

/// Classes taught a subject more often than its weekly hours.
fn check_subject_hours(grid: &Timetable, subjects: &HashMap<&str, &Subject>, out: &mut Vec<Violation>) {
    let mut counts: BTreeMap<(Grade, &str, &str), u32> = BTreeMap::new();
    for slot in grid.slots().filter(|s| s.is_assigned()) {
        if let Some(subject_id) = slot.subject_id.as_deref() {
            *counts.entry((slot.grade, slot.section.as_str(), subject_id)).or_default() += 1;
        }
    }
    for ((grade, section, subject_id), taught) in counts {
        let Some(subject) = subjects.get(subject_id) else {
            continue;
        };
        let required = subject.hours_for(grade);
        if taught > required {
            let mut v = Violation::new(
                ViolationKind::ExcessSubjectHours,
                format!("{grade}-{section} has {taught} hours of {subject_id}, {required} required"),
            );
            v.grade = Some(grade);
            v.section = Some(section.to_string());
            out.push(v);
        }
    }
}

/// Candidates (re-derived from the roster) whose hours are not all in the grid.
fn unassigned_requirements(
    grid: &Timetable,
    teachers: &[Teacher],
    subjects: &[Subject],
) -> Vec<UnassignedRequirement> {
    let mut placed: HashMap<(&str, &str, Grade, &str), u32> = HashMap::new();
    for slot in grid.slots() {
        if let (Some(t), Some(s)) = (slot.teacher_id.as_deref(), slot.subject_id.as_deref()) {
            *placed.entry((t, s, slot.grade, slot.section.as_str())).or_default() += 1;
        }
    }

    generate_candidates(&grid.classes(), teachers, subjects)
        .into_iter()
        .filter_map(|c| {
            let found = placed
                .get(&(c.teacher_id.as_str(), c.subject_id.as_str(), c.grade, c.section.as_str()))
                .copied()
                .unwrap_or(0);
            let assigned = found.min(c.required_hours);
            (assigned < c.required_hours).then(|| UnassignedRequirement {
                missing_hours: c.required_hours - assigned,
                assigned_hours: assigned,
                required_hours: c.required_hours,
                teacher_id: c.teacher_id,
                subject_id: c.subject_id,
                grade: c.grade,
                section: c.section,
            })
        })
        .collect()
}

fn suggestions(
    violations: &[Violation],
    unassigned: &[UnassignedRequirement],
    metrics: &TimetableStatistics,
) -> Vec<String> {
    let count = |kind: ViolationKind| violations.iter().filter(|v| v.kind == kind).count();
    let mut out = Vec::new();

    let double = count(ViolationKind::TeacherDoubleBooked);
    if double > 0 {
        out.push(format!("Resolve {double} teacher double-booking(s) by moving one of the lessons"));
    }
    let rooms = count(ViolationKind::ClassroomDoubleBooked) + count(ViolationKind::ClassroomCapacityExceeded);
    if rooms > 0 {
        out.push(format!("Resolve {rooms} classroom conflict(s) or add classrooms of the contested type"));
    }
    let roster = count(ViolationKind::UnqualifiedTeacher)
        + count(ViolationKind::GradeNotApplicable)
        + count(ViolationKind::UnknownReference);
    if roster > 0 {
        out.push(format!("Check {roster} slot(s) whose teacher, subject, or grade does not match the roster"));
    }
    let mandatory = count(ViolationKind::MandatoryRestriction);
    if mandatory > 0 {
        out.push(format!("Move {mandatory} lesson(s) out of slots forbidden by mandatory restrictions"));
    }
    let recommended = count(ViolationKind::RecommendedRestriction);
    if recommended > 0 {
        out.push(format!("Consider moving {recommended} lesson(s) that go against recommended restrictions"));
    }
    let excess = count(ViolationKind::ExcessSubjectHours);
    if excess > 0 {
        out.push(format!("Reduce {excess} class subject(s) taught beyond their weekly hours"));
    }
    if !unassigned.is_empty() {
        let missing: u32 = unassigned.iter().map(|u| u.missing_hours).sum();
        out.push(format!(
            "{} requirement(s) are missing {missing} hour(s) in total; add teachers or reduce weekly hours",
            unassigned.len()
        ));
    }
    if metrics.total_slots > 0 && metrics.unassigned_slots > 0 {
        out.push(format!(
            "{} slot(s) are empty ({:.2}% assigned); regenerate with more retries or fill them manually",
            metrics.unassigned_slots, metrics.assignment_rate
        ));
    }
    if out.is_empty() {
        out.push("Timetable passes all checks".to_string());
    }
    out
}
