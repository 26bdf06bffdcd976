//! School configuration model.
//!
//! Describes the shape of the week (days and periods) and of the student
//! body (grades and class sections). Built by the settings normalizer and
//! immutable for the rest of a generation run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, TimetableError};

/// School grade (year level).
pub type Grade = u32;

/// Complete school configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolConfiguration {
    /// Grades in teaching order.
    pub grades: Vec<Grade>,
    /// Section labels per grade.
    pub sections: BTreeMap<Grade, Vec<String>>,
    /// Teaching days in week order.
    pub days: Vec<String>,
    /// Periods on every day except Saturday.
    pub daily_periods: u32,
    /// Periods on Saturday.
    pub saturday_periods: u32,
}

/// One class: a section within a grade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassRef {
    /// Grade of the class.
    pub grade: Grade,
    /// Section label within the grade.
    pub section: String,
}

impl ClassRef {
    /// Creates a class reference.
    pub fn new(grade: Grade, section: impl Into<String>) -> Self {
        Self {
            grade,
            section: section.into(),
        }
    }
}

impl std::fmt::Display for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.grade, self.section)
    }
}

/// Whether a day label names Saturday.
///
/// Accepts English labels case-insensitively (`"Sat"`, `"saturday"`) and
/// the Korean `"토"` / `"토요일"`.
pub fn is_saturday(day: &str) -> bool {
    let day = day.trim();
    day.to_ascii_lowercase().starts_with("sat") || day.starts_with('토')
}

impl SchoolConfiguration {
    /// Creates a configuration with the given days and daily period count.
    ///
    /// Saturday defaults to the same period count; grades are added with
    /// [`with_grade`](Self::with_grade).
    pub fn new<S: Into<String>>(days: impl IntoIterator<Item = S>, daily_periods: u32) -> Self {
        Self {
            grades: Vec::new(),
            sections: BTreeMap::new(),
            days: days.into_iter().map(Into::into).collect(),
            daily_periods,
            saturday_periods: daily_periods,
        }
    }

    /// Adds a grade with its section labels.
    pub fn with_grade<S: Into<String>>(
        mut self,
        grade: Grade,
        sections: impl IntoIterator<Item = S>,
    ) -> Self {
        if !self.grades.contains(&grade) {
            self.grades.push(grade);
        }
        self.sections
            .insert(grade, sections.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the Saturday period count.
    pub fn with_saturday_periods(mut self, periods: u32) -> Self {
        self.saturday_periods = periods;
        self
    }

    /// Number of periods taught on `day`.
    pub fn periods_on(&self, day: &str) -> u32 {
        if is_saturday(day) {
            self.saturday_periods
        } else {
            self.daily_periods
        }
    }

    /// Section labels of a grade (empty if the grade has none).
    pub fn sections_of(&self, grade: Grade) -> &[String] {
        self.sections.get(&grade).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All classes, in grade order then section order.
    pub fn classes(&self) -> Vec<ClassRef> {
        self.grades
            .iter()
            .flat_map(|&g| self.sections_of(g).iter().map(move |s| ClassRef::new(g, s.clone())))
            .collect()
    }

    /// Total number of timetable slots this configuration yields.
    pub fn slot_count(&self) -> usize {
        let classes = self.classes().len();
        self.days
            .iter()
            .map(|d| self.periods_on(d) as usize * classes)
            .sum()
    }

    /// Checks that a grid can be built from this configuration.
    ///
    /// # Errors
    /// [`TimetableError::InvalidConfiguration`] when there are no days, no
    /// grades, no sections, a zero period count on a configured day, a
    /// section mapping for a grade outside the grade list, or a section
    /// label listed twice within one grade.
    pub fn check(&self) -> Result<()> {
        if self.days.is_empty() {
            return Err(TimetableError::InvalidConfiguration(
                "day list is empty".into(),
            ));
        }
        if self.grades.is_empty() {
            return Err(TimetableError::InvalidConfiguration(
                "grade list is empty".into(),
            ));
        }
        if let Some(grade) = self.sections.keys().find(|g| !self.grades.contains(g)) {
            return Err(TimetableError::InvalidConfiguration(format!(
                "sections defined for grade {grade} which is not in the grade list"
            )));
        }
        for (grade, labels) in &self.sections {
            let mut seen = HashSet::new();
            if let Some(label) = labels.iter().find(|l| !seen.insert(l.as_str())) {
                return Err(TimetableError::InvalidConfiguration(format!(
                    "section '{label}' listed twice for grade {grade}"
                )));
            }
        }
        if self.classes().is_empty() {
            return Err(TimetableError::InvalidConfiguration(
                "no class sections configured".into(),
            ));
        }
        if let Some(day) = self.days.iter().find(|d| self.periods_on(d) == 0) {
            return Err(TimetableError::InvalidConfiguration(format!(
                "day '{day}' has zero periods"
            )));
        }
        Ok(())
    }
}
