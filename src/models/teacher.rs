//! Teacher model.
//!
//! Teachers are the primary resource of a timetable: each can be in at
//! most one class per period. A teacher carries the subjects they teach,
//! the grades they may teach, placement restrictions, and an optional
//! weekly hour cap.

use serde::{Deserialize, Serialize};

use super::{Grade, SlotTime};

/// Weekly hours assumed available when a teacher has no explicit cap.
pub const DEFAULT_AVAILABLE_HOURS: u32 = 30;

/// A teacher that can be assigned to timetable slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Subjects this teacher teaches.
    pub subject_ids: Vec<String>,
    /// Grades this teacher may teach. Empty = any grade.
    pub grades: Vec<Grade>,
    /// Placement restrictions.
    pub restrictions: Vec<Restriction>,
    /// Hard cap on weekly teaching hours.
    pub max_weekly_hours: Option<u32>,
}

/// Strength of a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestrictionLevel {
    /// Hard: placed first, and blocked slots are never used.
    Mandatory,
    /// Soft: placed early, blocked slots are penalized but allowed.
    Recommended,
}

/// A placement restriction attached to a teacher.
///
/// The restriction applies to the teacher's lessons for `grade`, narrowed
/// by `section` and `subject_id` when present. Its `blocked_slots` are the
/// (day, period) pairs at which those lessons must not (mandatory) or
/// should not (recommended) take place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    /// Hard or soft.
    pub level: RestrictionLevel,
    /// Grade the restriction applies to.
    pub grade: Grade,
    /// Section the restriction applies to. `None` = every section.
    #[serde(default)]
    pub section: Option<String>,
    /// Subject the restriction applies to. `None` = every subject.
    #[serde(default)]
    pub subject_id: Option<String>,
    /// Times at which the covered lessons are excluded.
    #[serde(default)]
    pub blocked_slots: Vec<SlotTime>,
}

impl Teacher {
    /// Creates a teacher with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            subject_ids: Vec::new(),
            grades: Vec::new(),
            restrictions: Vec::new(),
            max_weekly_hours: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a taught subject.
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_ids.push(subject_id.into());
        self
    }

    /// Restricts the teacher to the given grades.
    pub fn with_grades(mut self, grades: impl IntoIterator<Item = Grade>) -> Self {
        self.grades = grades.into_iter().collect();
        self
    }

    /// Adds a restriction.
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Sets the weekly hour cap.
    pub fn with_max_weekly_hours(mut self, hours: u32) -> Self {
        self.max_weekly_hours = Some(hours);
        self
    }

    /// Whether the teacher teaches a subject.
    pub fn teaches(&self, subject_id: &str) -> bool {
        self.subject_ids.iter().any(|s| s == subject_id)
    }

    /// Whether the teacher may teach a grade.
    pub fn may_teach_grade(&self, grade: Grade) -> bool {
        self.grades.is_empty() || self.grades.contains(&grade)
    }

    /// Weekly hours available for load analysis.
    pub fn available_hours(&self) -> u32 {
        self.max_weekly_hours.unwrap_or(DEFAULT_AVAILABLE_HOURS)
    }

    /// Strongest restriction level covering a lesson, if any.
    pub fn restriction_level_for(
        &self,
        subject_id: &str,
        grade: Grade,
        section: &str,
    ) -> Option<RestrictionLevel> {
        let mut level = None;
        for r in self.restrictions.iter().filter(|r| r.matches(subject_id, grade, section)) {
            match r.level {
                RestrictionLevel::Mandatory => return Some(RestrictionLevel::Mandatory),
                RestrictionLevel::Recommended => level = Some(RestrictionLevel::Recommended),
            }
        }
        level
    }

    /// Restrictions that exclude a lesson at the given time.
    pub fn blocking_restrictions<'a>(
        &'a self,
        subject_id: &'a str,
        grade: Grade,
        section: &'a str,
        day: &'a str,
        period: u32,
    ) -> impl Iterator<Item = &'a Restriction> + 'a {
        self.restrictions
            .iter()
            .filter(move |r| r.forbids(subject_id, grade, section, day, period))
    }
}

impl Restriction {
    /// Creates a mandatory restriction for a grade.
    pub fn mandatory(grade: Grade) -> Self {
        Self::new(RestrictionLevel::Mandatory, grade)
    }

    /// Creates a recommended restriction for a grade.
    pub fn recommended(grade: Grade) -> Self {
        Self::new(RestrictionLevel::Recommended, grade)
    }

    fn new(level: RestrictionLevel, grade: Grade) -> Self {
        Self {
            level,
            grade,
            section: None,
            subject_id: None,
            blocked_slots: Vec::new(),
        }
    }

    /// Narrows the restriction to one section.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Narrows the restriction to one subject.
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// Excludes a (day, period) pair.
    pub fn blocking(mut self, day: impl Into<String>, period: u32) -> Self {
        self.blocked_slots.push(SlotTime::new(day, period));
        self
    }

    /// Whether this restriction covers a lesson.
    pub fn matches(&self, subject_id: &str, grade: Grade, section: &str) -> bool {
        self.grade == grade
            && self.section.as_deref().map_or(true, |s| s == section)
            && self.subject_id.as_deref().map_or(true, |s| s == subject_id)
    }

    /// Whether this restriction excludes a lesson at the given time.
    pub fn forbids(
        &self,
        subject_id: &str,
        grade: Grade,
        section: &str,
        day: &str,
        period: u32,
    ) -> bool {
        self.matches(subject_id, grade, section)
            && self
                .blocked_slots
                .iter()
                .any(|t| t.day == day && t.period == period)
    }
}
