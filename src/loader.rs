//! Roster loading boundary.
//!
//! Storage layers hand over loosely typed records: lists encoded as JSON
//! strings or comma lists, numbers as strings, flags as `"1"`. This module
//! coerces them once into the strict roster types. Records that cannot be
//! used are skipped and reported as [`InputAnomaly`] values; loading itself
//! never fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::{Classroom, Grade, Restriction, Subject, Teacher};

/// Raw teacher record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTeacher {
    /// Teacher ID, string or number. Required.
    pub id: Option<Value>,
    /// Display name.
    pub name: Option<String>,
    /// Subject IDs: array, JSON-encoded array, or comma list.
    #[serde(alias = "subjectIds")]
    pub subjects: Option<Value>,
    /// Grades taught, same list forms. Empty means any grade.
    pub grades: Option<Value>,
    /// Restriction objects, or a JSON string holding them.
    pub restrictions: Option<Value>,
    /// Weekly hour cap, number or numeric string.
    pub max_weekly_hours: Option<Value>,
}

/// Raw subject record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSubject {
    /// Subject ID, string or number. Required.
    pub id: Option<Value>,
    /// Display name.
    pub name: Option<String>,
    /// Grades the subject is taught in.
    pub grades: Option<Value>,
    /// Hours per grade: object keyed by grade (possibly JSON-encoded), or
    /// one number for every listed grade.
    pub weekly_hours: Option<Value>,
    /// Special-room flag: bool, `"1"`/`"true"`, or a number.
    pub requires_special_room: Option<Value>,
    /// Room type needed when the flag is set.
    pub classroom_type: Option<String>,
}

/// Raw classroom record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawClassroom {
    /// Classroom ID, string or number. Required.
    pub id: Option<Value>,
    /// Display name.
    pub name: Option<String>,
    /// Seat count, number or numeric string.
    pub capacity: Option<Value>,
    /// Room type. Required.
    #[serde(alias = "type")]
    pub classroom_type: Option<String>,
}

/// All raw records of one school.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRoster {
    /// Teacher records.
    pub teachers: Vec<RawTeacher>,
    /// Subject records.
    pub subjects: Vec<RawSubject>,
    /// Classroom records.
    pub classrooms: Vec<RawClassroom>,
}

/// Which kind of record an anomaly concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// A teacher record.
    Teacher,
    /// A subject record.
    Subject,
    /// A classroom record.
    Classroom,
}

/// A record (or part of one) that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputAnomaly {
    /// Record kind.
    pub entity: EntityKind,
    /// Record ID, or its position when the ID is missing.
    pub id: String,
    /// What was wrong.
    pub reason: String,
}

/// Strictly typed roster.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Loaded teachers.
    pub teachers: Vec<Teacher>,
    /// Loaded subjects.
    pub subjects: Vec<Subject>,
    /// Loaded classrooms.
    pub classrooms: Vec<Classroom>,
    /// Skipped records and fields.
    pub anomalies: Vec<InputAnomaly>,
}

/// Coerces raw records into a typed roster.
pub fn load_roster(raw: &RawRoster) -> Roster {
    let mut roster = Roster::default();

    for (i, rec) in raw.teachers.iter().enumerate() {
        if let Some(t) = load_teacher(i, rec, &mut roster.anomalies) {
            roster.teachers.push(t);
        }
    }
    for (i, rec) in raw.subjects.iter().enumerate() {
        if let Some(s) = load_subject(i, rec, &mut roster.anomalies) {
            roster.subjects.push(s);
        }
    }
    for (i, rec) in raw.classrooms.iter().enumerate() {
        if let Some(c) = load_classroom(i, rec, &mut roster.anomalies) {
            roster.classrooms.push(c);
        }
    }

    for a in &roster.anomalies {
        warn!(entity = ?a.entity, id = %a.id, reason = %a.reason, "skipped roster input");
    }
    roster
}

fn anomaly(entity: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> InputAnomaly {
    InputAnomaly {
        entity,
        id: id.into(),
        reason: reason.into(),
    }
}

fn load_teacher(i: usize, rec: &RawTeacher, anomalies: &mut Vec<InputAnomaly>) -> Option<Teacher> {
    let Some(id) = rec.id.as_ref().and_then(scalar_string) else {
        anomalies.push(anomaly(EntityKind::Teacher, format!("#{i}"), "missing id"));
        return None;
    };

    let mut teacher = Teacher::new(id.clone());
    teacher.name = rec.name.clone().unwrap_or_default();
    teacher.subject_ids = rec.subjects.as_ref().map(list_of_strings).unwrap_or_default();
    teacher.grades = rec.grades.as_ref().map(list_of_grades).unwrap_or_default();
    teacher.max_weekly_hours = rec.max_weekly_hours.as_ref().and_then(scalar_u32);

    if let Some(value) = rec.restrictions.as_ref() {
        for (n, item) in list_items(value).into_iter().enumerate() {
            match Restriction::deserialize(&item) {
                Ok(r) => teacher.restrictions.push(r),
                Err(e) => anomalies.push(anomaly(
                    EntityKind::Teacher,
                    id.clone(),
                    format!("restriction #{n} ignored: {e}"),
                )),
            }
        }
    }

    if teacher.subject_ids.is_empty() {
        anomalies.push(anomaly(EntityKind::Teacher, id, "teaches no subjects"));
    }
    Some(teacher)
}

fn load_subject(i: usize, rec: &RawSubject, anomalies: &mut Vec<InputAnomaly>) -> Option<Subject> {
    let Some(id) = rec.id.as_ref().and_then(scalar_string) else {
        anomalies.push(anomaly(EntityKind::Subject, format!("#{i}"), "missing id"));
        return None;
    };

    let mut subject = Subject::new(id.clone());
    subject.name = rec.name.clone().unwrap_or_default();
    subject.grades = rec.grades.as_ref().map(list_of_grades).unwrap_or_default();
    subject.weekly_hours = rec
        .weekly_hours
        .as_ref()
        .map(|v| weekly_hours(v, &subject.grades))
        .unwrap_or_default();
    if subject.grades.is_empty() {
        subject.grades = subject.weekly_hours.keys().copied().collect();
    }
    if subject.grades.is_empty() {
        anomalies.push(anomaly(EntityKind::Subject, id, "no applicable grades"));
        return None;
    }

    subject.requires_special_room = rec
        .requires_special_room
        .as_ref()
        .is_some_and(truthy);
    subject.classroom_type = rec
        .classroom_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if subject.requires_special_room && subject.classroom_type.is_none() {
        subject.requires_special_room = false;
        anomalies.push(anomaly(
            EntityKind::Subject,
            id,
            "special room required but no classroom type given; treated as regular",
        ));
    }
    Some(subject)
}

fn load_classroom(
    i: usize,
    rec: &RawClassroom,
    anomalies: &mut Vec<InputAnomaly>,
) -> Option<Classroom> {
    let Some(id) = rec.id.as_ref().and_then(scalar_string) else {
        anomalies.push(anomaly(EntityKind::Classroom, format!("#{i}"), "missing id"));
        return None;
    };
    let Some(kind) = rec
        .classroom_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        anomalies.push(anomaly(EntityKind::Classroom, id, "missing classroom type"));
        return None;
    };

    Some(
        Classroom::new(id, kind)
            .with_name(rec.name.clone().unwrap_or_default())
            .with_capacity(rec.capacity.as_ref().and_then(scalar_u32).unwrap_or(0)),
    )
}

/// String or number as a trimmed, non-empty string.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn scalar_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y"),
        _ => false,
    }
}

/// Expands a list-ish value: a JSON array, a JSON-encoded array string, a
/// comma-separated string, or a single scalar.
fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('[') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                    return items;
                }
            }
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| Value::String(p.to_string()))
                .collect()
        }
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn list_of_strings(value: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in list_items(value).iter().filter_map(scalar_string) {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

fn list_of_grades(value: &Value) -> Vec<Grade> {
    let mut out = Vec::new();
    for g in list_items(value).iter().filter_map(scalar_u32) {
        if !out.contains(&g) {
            out.push(g);
        }
    }
    out
}

/// Weekly hours: `{"1": 3}` (possibly JSON-encoded), or one number applied
/// to every listed grade.
fn weekly_hours(value: &Value, grades: &[Grade]) -> BTreeMap<Grade, u32> {
    let object = match value {
        Value::String(s) if s.trim().starts_with('{') => serde_json::from_str::<Value>(s.trim()).ok(),
        other => Some(other.clone()),
    };
    match object {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| Some((k.trim().parse::<Grade>().ok()?, scalar_u32(v)?)))
            .collect(),
        Some(v) => match scalar_u32(&v) {
            Some(hours) => grades.iter().map(|&g| (g, hours)).collect(),
            None => BTreeMap::new(),
        },
        None => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RestrictionLevel;
    use serde_json::json;

    fn roster(value: Value) -> Roster {
        let raw: RawRoster = serde_json::from_value(value).unwrap();
        load_roster(&raw)
    }

    #[test]
    fn test_string_encoded_fields() {
        let r = roster(json!({
            "teachers": [{
                "id": 7,
                "name": "Lee",
                "subjects": "[\"math\", \"sci\"]",
                "grades": "1,2",
                "maxWeeklyHours": "20",
            }],
            "subjects": [{
                "id": "math",
                "weeklyHours": "{\"1\": 4, \"2\": \"3\"}",
            }],
        }));
        assert!(r.anomalies.is_empty());
        let t = &r.teachers[0];
        assert_eq!(t.id, "7");
        assert_eq!(t.subject_ids, vec!["math", "sci"]);
        assert_eq!(t.grades, vec![1, 2]);
        assert_eq!(t.max_weekly_hours, Some(20));

        let s = &r.subjects[0];
        assert_eq!(s.grades, vec![1, 2]);
        assert_eq!(s.hours_for(2), 3);
    }

    #[test]
    fn test_scalar_weekly_hours_apply_to_all_grades() {
        let r = roster(json!({
            "subjects": [{ "id": "art", "grades": [1, 3], "weeklyHours": 2 }],
        }));
        assert_eq!(r.subjects[0].hours_for(1), 2);
        assert_eq!(r.subjects[0].hours_for(3), 2);
    }

    #[test]
    fn test_subject_without_grades_skipped() {
        let r = roster(json!({
            "subjects": [{ "id": "ghost" }, { "id": "pe", "weeklyHours": { "1": 2 } }],
        }));
        assert_eq!(r.subjects.len(), 1);
        assert_eq!(r.anomalies.len(), 1);
        assert_eq!(r.anomalies[0].id, "ghost");
        assert_eq!(r.anomalies[0].entity, EntityKind::Subject);
    }

    #[test]
    fn test_missing_ids_and_types() {
        let r = roster(json!({
            "teachers": [{ "name": "nobody" }],
            "classrooms": [{ "id": "R1" }, { "id": "R2", "type": "lab", "capacity": "30" }],
        }));
        assert!(r.teachers.is_empty());
        assert_eq!(r.classrooms.len(), 1);
        assert_eq!(r.classrooms[0].capacity, 30);
        assert_eq!(r.anomalies.len(), 2);
    }

    #[test]
    fn test_restrictions_parsed_and_bad_ones_reported() {
        let r = roster(json!({
            "teachers": [{
                "id": "T1",
                "subjects": ["math"],
                "restrictions": [
                    { "level": "mandatory", "grade": 1, "section": "A",
                      "blockedSlots": [{ "day": "Mon", "period": 1 }] },
                    { "level": "sometimes", "grade": 1 },
                ],
            }],
        }));
        let t = &r.teachers[0];
        assert_eq!(t.restrictions.len(), 1);
        assert_eq!(t.restrictions[0].level, RestrictionLevel::Mandatory);
        assert!(t.restrictions[0].forbids("math", 1, "A", "Mon", 1));
        assert_eq!(r.anomalies.len(), 1);
    }

    #[test]
    fn test_special_room_flag_coercion() {
        let r = roster(json!({
            "subjects": [
                { "id": "sci", "grades": [1], "requiresSpecialRoom": "1", "classroomType": "lab" },
                { "id": "pe", "grades": [1], "requiresSpecialRoom": true },
            ],
        }));
        assert_eq!(r.subjects[0].required_room_type(), Some("lab"));
        assert_eq!(r.subjects[1].required_room_type(), None);
        assert_eq!(r.anomalies.len(), 1);
    }
}
