//! Timetable (solution) model.
//!
//! A timetable is a grid indexed by day, then period within the day, then
//! a flat list with one slot per class. Every slot starts empty and is
//! either assigned a lesson or left empty by the engine.
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling", Sec. 2 (class-teacher model)

use serde::{Deserialize, Serialize};

use super::{ClassRef, Grade};

/// A (day, period) pair. Periods are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotTime {
    /// Day label.
    pub day: String,
    /// Period within the day (1-based).
    pub period: u32,
}

impl SlotTime {
    /// Creates a slot time.
    pub fn new(day: impl Into<String>, period: u32) -> Self {
        Self {
            day: day.into(),
            period,
        }
    }
}

/// Grid coordinates of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotPosition {
    /// Day index.
    pub day: usize,
    /// Period index within the day (0-based).
    pub period: usize,
    /// Class index within the period.
    pub index: usize,
}

/// Kind of soft violation recorded on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotViolationKind {
    /// Lesson placed at a time a recommended restriction excludes.
    RecommendedRestriction,
}

/// A soft violation accepted when the slot was filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotViolation {
    /// Violation kind.
    pub kind: SlotViolationKind,
    /// Teacher responsible.
    pub teacher_id: String,
    /// Human-readable description.
    pub message: String,
}

/// A lesson to write into a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotAssignment {
    /// Teacher ID.
    pub teacher_id: String,
    /// Subject ID.
    pub subject_id: String,
    /// Special classroom, if the subject needs one.
    pub classroom_id: Option<String>,
}

/// One (day, period, grade, section) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    /// Grade of the class.
    pub grade: Grade,
    /// Section of the class.
    pub section: String,
    /// Day label.
    pub day: String,
    /// Period within the day (1-based).
    pub period: u32,
    /// Assigned teacher.
    pub teacher_id: Option<String>,
    /// Assigned subject.
    pub subject_id: Option<String>,
    /// Assigned special classroom.
    pub classroom_id: Option<String>,
    /// Soft violations accepted for this lesson.
    #[serde(default)]
    pub violations: Vec<SlotViolation>,
}

impl TimetableSlot {
    /// Creates an empty slot.
    pub fn empty(grade: Grade, section: impl Into<String>, day: impl Into<String>, period: u32) -> Self {
        Self {
            grade,
            section: section.into(),
            day: day.into(),
            period,
            teacher_id: None,
            subject_id: None,
            classroom_id: None,
            violations: Vec::new(),
        }
    }

    /// Whether both teacher and subject are set.
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.teacher_id.is_some() && self.subject_id.is_some()
    }

    /// Writes a lesson into the slot.
    pub fn assign(&mut self, assignment: SlotAssignment, violations: Vec<SlotViolation>) {
        self.teacher_id = Some(assignment.teacher_id);
        self.subject_id = Some(assignment.subject_id);
        self.classroom_id = assignment.classroom_id;
        self.violations = violations;
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.teacher_id = None;
        self.subject_id = None;
        self.classroom_id = None;
        self.violations.clear();
    }

    /// The slot's (day, period).
    pub fn time(&self) -> SlotTime {
        SlotTime::new(self.day.clone(), self.period)
    }

    /// The slot's class.
    pub fn class_ref(&self) -> ClassRef {
        ClassRef::new(self.grade, self.section.clone())
    }

    /// Whether the slot belongs to a class.
    pub fn is_for_class(&self, grade: Grade, section: &str) -> bool {
        self.grade == grade && self.section == section
    }

    /// Whether the slot is taught by a teacher.
    pub fn is_taught_by(&self, teacher_id: &str) -> bool {
        self.teacher_id.as_deref() == Some(teacher_id)
    }
}

/// A complete timetable grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timetable {
    /// `grid[day][period]` is the list of class slots at that time.
    pub grid: Vec<Vec<Vec<TimetableSlot>>>,
}

impl Timetable {
    /// Creates a timetable from a prepared grid.
    pub fn from_grid(grid: Vec<Vec<Vec<TimetableSlot>>>) -> Self {
        Self { grid }
    }

    /// All slots in day, period, class order.
    pub fn slots(&self) -> impl Iterator<Item = &TimetableSlot> {
        self.grid.iter().flatten().flatten()
    }

    /// All slot positions in day, period, class order.
    pub fn positions(&self) -> Vec<SlotPosition> {
        let mut out = Vec::with_capacity(self.total_slots());
        for (day, periods) in self.grid.iter().enumerate() {
            for (period, slots) in periods.iter().enumerate() {
                out.extend((0..slots.len()).map(|index| SlotPosition { day, period, index }));
            }
        }
        out
    }

    /// Slot at a position.
    pub fn slot(&self, pos: SlotPosition) -> Option<&TimetableSlot> {
        self.grid.get(pos.day)?.get(pos.period)?.get(pos.index)
    }

    /// Mutable slot at a position.
    pub fn slot_mut(&mut self, pos: SlotPosition) -> Option<&mut TimetableSlot> {
        self.grid.get_mut(pos.day)?.get_mut(pos.period)?.get_mut(pos.index)
    }

    /// All class slots sharing the position's day and period.
    pub fn concurrent_slots(&self, pos: SlotPosition) -> &[TimetableSlot] {
        self.grid
            .get(pos.day)
            .and_then(|d| d.get(pos.period))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finds a slot by its labels.
    pub fn find_slot(
        &self,
        day: &str,
        period: u32,
        grade: Grade,
        section: &str,
    ) -> Option<&TimetableSlot> {
        self.slots()
            .find(|s| s.day == day && s.period == period && s.is_for_class(grade, section))
    }

    /// Mutable variant of [`find_slot`](Self::find_slot).
    pub fn find_slot_mut(
        &mut self,
        day: &str,
        period: u32,
        grade: Grade,
        section: &str,
    ) -> Option<&mut TimetableSlot> {
        self.grid
            .iter_mut()
            .flatten()
            .flatten()
            .find(|s| s.day == day && s.period == period && s.is_for_class(grade, section))
    }

    /// Distinct classes present in the grid, in first-seen order.
    pub fn classes(&self) -> Vec<ClassRef> {
        let mut out: Vec<ClassRef> = Vec::new();
        for slot in self.slots() {
            if !out.iter().any(|c| slot.is_for_class(c.grade, &c.section)) {
                out.push(slot.class_ref());
            }
        }
        out
    }

    /// Slots taught by a teacher.
    pub fn slots_for_teacher(&self, teacher_id: &str) -> Vec<&TimetableSlot> {
        self.slots().filter(|s| s.is_taught_by(teacher_id)).collect()
    }

    /// Number of slots.
    pub fn total_slots(&self) -> usize {
        self.grid.iter().flatten().map(Vec::len).sum()
    }

    /// Number of slots with a teacher and a subject.
    pub fn assigned_slots(&self) -> usize {
        self.slots().filter(|s| s.is_assigned()).count()
    }

    /// Sum of recorded slot violations.
    pub fn violation_count(&self) -> usize {
        self.slots().map(|s| s.violations.len()).sum()
    }
}
