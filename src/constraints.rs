//! Placement constraint checking.
//!
//! [`ConstraintChecker::check`] is a pure predicate over a proposed
//! placement. Checks run in order and the first hard failure wins:
//!
//! 1. Teacher occupancy: the teacher is not teaching another class in the
//!    same period, and stays within their weekly hour cap.
//! 2. Classroom occupancy: a subject needing a special room type gets one
//!    of the free rooms of that type; with N rooms of a type, at most N
//!    lessons of that type run concurrently.
//! 3. Restrictions: a mandatory restriction blocking the time rejects the
//!    placement; a recommended one is accepted and reported as a soft
//!    violation.
//! 4. Applicability: the subject is taught to the slot's grade, the teacher
//!    may teach that grade, and the candidate targets the slot's class.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::models::{
    AssignmentCandidate, Classroom, Grade, RestrictionLevel, SlotPosition, SlotViolation,
    SlotViolationKind, Subject, Teacher, Timetable,
};

/// Why a placement was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The candidate's teacher is not in the roster.
    UnknownTeacher,
    /// The candidate's subject is not in the roster.
    UnknownSubject,
    /// The teacher already teaches another class in this period.
    TeacherBusy,
    /// The teacher reached their weekly hour cap.
    TeacherWeeklyLimit { limit: u32 },
    /// Every classroom of the required type is in use (or none exist).
    ClassroomUnavailable { classroom_type: String },
    /// A mandatory restriction excludes this time.
    MandatoryRestriction,
    /// The subject or teacher does not cover the slot's grade.
    GradeNotApplicable,
    /// The candidate targets a different class.
    ClassMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTeacher => write!(f, "unknown teacher"),
            Self::UnknownSubject => write!(f, "unknown subject"),
            Self::TeacherBusy => write!(f, "teacher already teaching in this period"),
            Self::TeacherWeeklyLimit { limit } => {
                write!(f, "teacher reached weekly limit of {limit} hours")
            }
            Self::ClassroomUnavailable { classroom_type } => {
                write!(f, "no free '{classroom_type}' classroom")
            }
            Self::MandatoryRestriction => write!(f, "blocked by mandatory restriction"),
            Self::GradeNotApplicable => write!(f, "grade not applicable"),
            Self::ClassMismatch => write!(f, "candidate targets another class"),
        }
    }
}

/// Outcome of a placement check.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The placement may be made.
    Allowed {
        /// Classroom to use, for subjects needing a special room.
        classroom_id: Option<String>,
        /// Soft violations the placement incurs.
        soft_violations: Vec<SlotViolation>,
    },
    /// The placement violates a hard constraint.
    Rejected(Rejection),
}

impl Placement {
    /// Whether the placement is allowed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Allowed { .. } => None,
        }
    }
}

/// Hours placed so far in one engine run, per teacher and per class-subject.
#[derive(Debug, Clone, Default)]
pub struct PlacementLedger {
    teacher_hours: HashMap<String, u32>,
    class_subject_hours: HashMap<(Grade, String, String), u32>,
}

impl PlacementLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one placed hour of a candidate.
    pub fn record(&mut self, c: &AssignmentCandidate) {
        *self.teacher_hours.entry(c.teacher_id.clone()).or_insert(0) += 1;
        *self
            .class_subject_hours
            .entry((c.grade, c.section.clone(), c.subject_id.clone()))
            .or_insert(0) += 1;
    }

    /// Removes one placed hour of a candidate.
    pub fn release(&mut self, c: &AssignmentCandidate) {
        if let Some(h) = self.teacher_hours.get_mut(&c.teacher_id) {
            *h = h.saturating_sub(1);
        }
        let key = (c.grade, c.section.clone(), c.subject_id.clone());
        if let Some(h) = self.class_subject_hours.get_mut(&key) {
            *h = h.saturating_sub(1);
        }
    }

    /// Hours placed for a teacher.
    pub fn teacher_hours(&self, teacher_id: &str) -> u32 {
        self.teacher_hours.get(teacher_id).copied().unwrap_or(0)
    }

    /// Hours of a subject placed in a class.
    pub fn class_subject_hours(&self, grade: Grade, section: &str, subject_id: &str) -> u32 {
        self.class_subject_hours
            .get(&(grade, section.to_string(), subject_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Roster lookups for placement checks.
#[derive(Debug, Clone)]
pub struct ConstraintChecker<'a> {
    teachers: HashMap<&'a str, &'a Teacher>,
    subjects: HashMap<&'a str, &'a Subject>,
    rooms_by_type: HashMap<&'a str, Vec<&'a Classroom>>,
}

impl<'a> ConstraintChecker<'a> {
    /// Indexes the roster.
    pub fn new(teachers: &'a [Teacher], subjects: &'a [Subject], classrooms: &'a [Classroom]) -> Self {
        let mut rooms_by_type: HashMap<&str, Vec<&Classroom>> = HashMap::new();
        for room in classrooms {
            rooms_by_type
                .entry(room.classroom_type.as_str())
                .or_default()
                .push(room);
        }
        Self {
            teachers: teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            subjects: subjects.iter().map(|s| (s.id.as_str(), s)).collect(),
            rooms_by_type,
        }
    }

    /// Teacher by ID.
    pub fn teacher(&self, id: &str) -> Option<&'a Teacher> {
        self.teachers.get(id).copied()
    }

    /// Subject by ID.
    pub fn subject(&self, id: &str) -> Option<&'a Subject> {
        self.subjects.get(id).copied()
    }

    /// Number of classrooms of a type.
    pub fn room_capacity(&self, classroom_type: &str) -> usize {
        self.rooms_by_type.get(classroom_type).map_or(0, Vec::len)
    }

    /// Checks placing `candidate` into the slot at `pos`.
    pub fn check(
        &self,
        grid: &Timetable,
        ledger: &PlacementLedger,
        pos: SlotPosition,
        candidate: &AssignmentCandidate,
    ) -> Placement {
        let Some(slot) = grid.slot(pos) else {
            return Placement::Rejected(Rejection::ClassMismatch);
        };
        let Some(teacher) = self.teacher(&candidate.teacher_id) else {
            return Placement::Rejected(Rejection::UnknownTeacher);
        };
        let Some(subject) = self.subject(&candidate.subject_id) else {
            return Placement::Rejected(Rejection::UnknownSubject);
        };
        let concurrent = grid.concurrent_slots(pos);

        // Teacher occupancy
        let busy = concurrent
            .iter()
            .enumerate()
            .any(|(i, s)| i != pos.index && s.is_taught_by(&teacher.id));
        if busy {
            return Placement::Rejected(Rejection::TeacherBusy);
        }
        if let Some(limit) = teacher.max_weekly_hours {
            if ledger.teacher_hours(&teacher.id) >= limit {
                return Placement::Rejected(Rejection::TeacherWeeklyLimit { limit });
            }
        }

        // Classroom occupancy
        let classroom_id = match subject.required_room_type() {
            None => None,
            Some(kind) => {
                let in_use: HashSet<&str> = concurrent
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != pos.index)
                    .filter_map(|(_, s)| s.classroom_id.as_deref())
                    .collect();
                let free = self
                    .rooms_by_type
                    .get(kind)
                    .and_then(|rooms| rooms.iter().find(|r| !in_use.contains(r.id.as_str())));
                match free {
                    Some(room) => Some(room.id.clone()),
                    None => {
                        return Placement::Rejected(Rejection::ClassroomUnavailable {
                            classroom_type: kind.to_string(),
                        })
                    }
                }
            }
        };

        // Restrictions
        let mut soft_violations = Vec::new();
        for r in teacher.blocking_restrictions(
            &subject.id,
            slot.grade,
            &slot.section,
            &slot.day,
            slot.period,
        ) {
            match r.level {
                RestrictionLevel::Mandatory => {
                    return Placement::Rejected(Rejection::MandatoryRestriction)
                }
                RestrictionLevel::Recommended => soft_violations.push(SlotViolation {
                    kind: SlotViolationKind::RecommendedRestriction,
                    teacher_id: teacher.id.clone(),
                    message: format!(
                        "{} teaches {} to {}-{} at {} period {} against a recommended restriction",
                        teacher.id, subject.id, slot.grade, slot.section, slot.day, slot.period
                    ),
                }),
            }
        }

        // Applicability
        if !candidate.is_for_class(slot.grade, &slot.section) {
            return Placement::Rejected(Rejection::ClassMismatch);
        }
        if !subject.applies_to(slot.grade) || !teacher.may_teach_grade(slot.grade) {
            return Placement::Rejected(Rejection::GradeNotApplicable);
        }

        Placement::Allowed {
            classroom_id,
            soft_violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Restriction, SchoolConfiguration, SlotAssignment};
    use crate::scheduler::build_grid;

    struct Fixture {
        teachers: Vec<Teacher>,
        subjects: Vec<Subject>,
        classrooms: Vec<Classroom>,
        grid: Timetable,
    }

    fn fixture() -> Fixture {
        let config = SchoolConfiguration::new(["Mon", "Tue"], 2).with_grade(1, ["A", "B", "C"]);
        Fixture {
            teachers: vec![
                Teacher::new("T1")
                    .with_subject("math")
                    .with_subject("sci")
                    .with_restriction(Restriction::mandatory(1).with_section("A").blocking("Mon", 2))
                    .with_restriction(Restriction::recommended(1).with_section("B").blocking("Tue", 1)),
                Teacher::new("T2").with_subject("sci"),
                Teacher::new("T3").with_subject("sci"),
                Teacher::new("T4").with_subject("math").with_grades([2]),
                Teacher::new("T5").with_subject("math").with_max_weekly_hours(1),
            ],
            subjects: vec![
                Subject::new("math").with_weekly_hours(1, 4),
                Subject::new("sci").with_weekly_hours(1, 2).with_special_room("lab"),
            ],
            classrooms: vec![Classroom::new("LAB1", "lab"), Classroom::new("LAB2", "lab")],
            grid: build_grid(&config).unwrap(),
        }
    }

    fn pos(day: usize, period: usize, index: usize) -> SlotPosition {
        SlotPosition { day, period, index }
    }

    fn place(grid: &mut Timetable, p: SlotPosition, teacher: &str, subject: &str, room: Option<&str>) {
        grid.slot_mut(p).unwrap().assign(
            SlotAssignment {
                teacher_id: teacher.into(),
                subject_id: subject.into(),
                classroom_id: room.map(str::to_string),
            },
            Vec::new(),
        );
    }

    #[test]
    fn test_allowed_on_empty_grid() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let c = AssignmentCandidate::new("T1", "math", 1, "A", 4);
        let result = checker.check(&f.grid, &PlacementLedger::new(), pos(0, 0, 0), &c);
        assert_eq!(
            result,
            Placement::Allowed {
                classroom_id: None,
                soft_violations: Vec::new()
            }
        );
    }

    #[test]
    fn test_teacher_busy() {
        let mut f = fixture();
        place(&mut f.grid, pos(0, 0, 1), "T1", "math", None);
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let c = AssignmentCandidate::new("T1", "math", 1, "A", 4);

        let busy = checker.check(&f.grid, &PlacementLedger::new(), pos(0, 0, 0), &c);
        assert_eq!(busy.reason(), Some(&Rejection::TeacherBusy));

        // Same class on Tuesday is free
        let free = checker.check(&f.grid, &PlacementLedger::new(), pos(1, 0, 0), &c);
        assert!(free.is_valid());
    }

    #[test]
    fn test_weekly_limit() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let c = AssignmentCandidate::new("T5", "math", 1, "A", 4);
        let mut ledger = PlacementLedger::new();
        assert!(checker.check(&f.grid, &ledger, pos(0, 0, 0), &c).is_valid());

        ledger.record(&c);
        assert_eq!(
            checker.check(&f.grid, &ledger, pos(0, 1, 0), &c).reason(),
            Some(&Rejection::TeacherWeeklyLimit { limit: 1 })
        );
    }

    #[test]
    fn test_classroom_pool_capacity() {
        let mut f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let ledger = PlacementLedger::new();
        assert_eq!(checker.room_capacity("lab"), 2);

        place(&mut f.grid, pos(0, 0, 0), "T2", "sci", Some("LAB1"));
        let second = AssignmentCandidate::new("T3", "sci", 1, "B", 2);
        match checker.check(&f.grid, &ledger, pos(0, 0, 1), &second) {
            Placement::Allowed { classroom_id, .. } => assert_eq!(classroom_id.as_deref(), Some("LAB2")),
            other => panic!("expected allowed, got {other:?}"),
        }

        place(&mut f.grid, pos(0, 0, 1), "T3", "sci", Some("LAB2"));
        let third = AssignmentCandidate::new("T1", "sci", 1, "C", 2);
        assert_eq!(
            checker.check(&f.grid, &ledger, pos(0, 0, 2), &third).reason(),
            Some(&Rejection::ClassroomUnavailable {
                classroom_type: "lab".into()
            })
        );
    }

    #[test]
    fn test_no_rooms_of_type() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &[]);
        let c = AssignmentCandidate::new("T2", "sci", 1, "A", 2);
        assert!(!checker.check(&f.grid, &PlacementLedger::new(), pos(0, 0, 0), &c).is_valid());
    }

    #[test]
    fn test_mandatory_restriction_rejects() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let c = AssignmentCandidate::new("T1", "math", 1, "A", 4);
        // Mon period 2, class 1-A
        assert_eq!(
            checker.check(&f.grid, &PlacementLedger::new(), pos(0, 1, 0), &c).reason(),
            Some(&Rejection::MandatoryRestriction)
        );
    }

    #[test]
    fn test_recommended_restriction_is_soft() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let c = AssignmentCandidate::new("T1", "math", 1, "B", 4);
        // Tue period 1, class 1-B
        match checker.check(&f.grid, &PlacementLedger::new(), pos(1, 0, 1), &c) {
            Placement::Allowed { soft_violations, .. } => {
                assert_eq!(soft_violations.len(), 1);
                assert_eq!(soft_violations[0].kind, SlotViolationKind::RecommendedRestriction);
            }
            other => panic!("expected allowed, got {other:?}"),
        }
    }

    #[test]
    fn test_applicability() {
        let f = fixture();
        let checker = ConstraintChecker::new(&f.teachers, &f.subjects, &f.classrooms);
        let ledger = PlacementLedger::new();

        let wrong_grade_teacher = AssignmentCandidate::new("T4", "math", 1, "A", 4);
        assert_eq!(
            checker.check(&f.grid, &ledger, pos(0, 0, 0), &wrong_grade_teacher).reason(),
            Some(&Rejection::GradeNotApplicable)
        );

        let wrong_class = AssignmentCandidate::new("T1", "math", 1, "B", 4);
        assert_eq!(
            checker.check(&f.grid, &ledger, pos(0, 0, 0), &wrong_class).reason(),
            Some(&Rejection::ClassMismatch)
        );

        let unknown = AssignmentCandidate::new("T9", "math", 1, "A", 4);
        assert_eq!(
            checker.check(&f.grid, &ledger, pos(0, 0, 0), &unknown).reason(),
            Some(&Rejection::UnknownTeacher)
        );
    }

    #[test]
    fn test_ledger() {
        let c = AssignmentCandidate::new("T1", "math", 1, "A", 4);
        let mut ledger = PlacementLedger::new();
        ledger.record(&c);
        ledger.record(&c);
        assert_eq!(ledger.teacher_hours("T1"), 2);
        assert_eq!(ledger.class_subject_hours(1, "A", "math"), 2);
        ledger.release(&c);
        assert_eq!(ledger.teacher_hours("T1"), 1);
        assert_eq!(ledger.class_subject_hours(1, "B", "math"), 0);
    }
}
