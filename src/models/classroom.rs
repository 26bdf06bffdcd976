//! Classroom model.
//!
//! Classrooms are pooled by type: a subject that needs a "lab" may use
//! any free classroom whose type is "lab".

use serde::{Deserialize, Serialize};

/// A classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    /// Unique classroom identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Seats.
    pub capacity: u32,
    /// Classroom type matched against `Subject::classroom_type`.
    pub classroom_type: String,
}

impl Classroom {
    /// Creates a classroom of the given type.
    pub fn new(id: impl Into<String>, classroom_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capacity: 0,
            classroom_type: classroom_type.into(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the seat count.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}
