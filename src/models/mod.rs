//! Timetabling domain models.
//!
//! Provides the data types for a school timetabling problem and its
//! solution. Roster entities (`Teacher`, `Subject`, `Classroom`) are
//! read-only inputs; `AssignmentCandidate` and `Timetable` are owned by a
//! single engine run.
//!
//! # Domain Mappings
//!
//! | u-timetable | Scheduling term |
//! |-------------|-----------------|
//! | Teacher | Primary resource |
//! | Classroom | Secondary resource (typed, pooled) |
//! | AssignmentCandidate | Job with a unit-time demand |
//! | TimetableSlot | Time bucket for one class |

mod candidate;
mod classroom;
mod school;
mod subject;
mod teacher;
mod timetable;

pub use candidate::{AssignmentCandidate, PriorityTier};
pub use classroom::Classroom;
pub use school::{is_saturday, ClassRef, Grade, SchoolConfiguration};
pub use subject::Subject;
pub use teacher::{Restriction, RestrictionLevel, Teacher, DEFAULT_AVAILABLE_HOURS};
pub use timetable::{
    SlotAssignment, SlotPosition, SlotTime, SlotViolation, SlotViolationKind, Timetable,
    TimetableSlot,
};
