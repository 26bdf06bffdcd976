//! Subject model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Grade;

/// A subject taught to one or more grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grades this subject is taught to.
    pub grades: Vec<Grade>,
    /// Weekly lesson count per grade.
    pub weekly_hours: BTreeMap<Grade, u32>,
    /// Whether lessons need a classroom of `classroom_type`.
    pub requires_special_room: bool,
    /// Required classroom type (e.g. "lab", "gym").
    pub classroom_type: Option<String>,
}

impl Subject {
    /// Creates a subject with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            grades: Vec::new(),
            weekly_hours: BTreeMap::new(),
            requires_special_room: false,
            classroom_type: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the weekly hours for a grade, adding the grade if needed.
    pub fn with_weekly_hours(mut self, grade: Grade, hours: u32) -> Self {
        if !self.grades.contains(&grade) {
            self.grades.push(grade);
        }
        self.weekly_hours.insert(grade, hours);
        self
    }

    /// Requires a classroom of the given type.
    pub fn with_special_room(mut self, classroom_type: impl Into<String>) -> Self {
        self.requires_special_room = true;
        self.classroom_type = Some(classroom_type.into());
        self
    }

    /// Whether the subject is taught to a grade.
    pub fn applies_to(&self, grade: Grade) -> bool {
        self.grades.contains(&grade)
    }

    /// Weekly hours for a grade (0 when undefined).
    pub fn hours_for(&self, grade: Grade) -> u32 {
        self.weekly_hours.get(&grade).copied().unwrap_or(0)
    }

    /// Classroom type needed by the subject, if it needs a special room.
    pub fn required_room_type(&self) -> Option<&str> {
        if self.requires_special_room {
            self.classroom_type.as_deref()
        } else {
            None
        }
    }
}
