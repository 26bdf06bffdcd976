//! Settings normalization.
//!
//! Turns possibly partial or malformed school settings into a complete
//! [`SchoolConfiguration`]. Normalization never fails: every missing or
//! unusable field falls back to a documented default.
//!
//! | Field | Accepted input | Default |
//! |-------|----------------|---------|
//! | `dailyPeriods` | positive number or numeric string | 6 |
//! | `saturdayPeriods` | positive number or numeric string | 4 |
//! | `gradeClassCounts` | `{"1": 4, ...}` or `[4, 4, 3]` | `{1: 4, 2: 4, 3: 3}` |
//! | `grades` | array or comma list of grade numbers | section keys, else class-count keys |
//! | `sections` | `{"1": ["A", "B"], ...}` (arrays or comma lists) | `"1".."n"` sized by class count |
//! | `days` | array or comma list of labels | Monday..Saturday |
//!
//! ```
//! use u_timetable::settings::{normalize_settings, RawSettings};
//!
//! let raw: RawSettings = serde_json::from_value(serde_json::json!({
//!     "dailyPeriods": "7",
//!     "gradeClassCounts": [2, 1],
//! })).unwrap();
//!
//! let config = normalize_settings(Some(&raw));
//! assert_eq!(config.daily_periods, 7);
//! assert_eq!(config.saturday_periods, 4);
//! assert_eq!(config.grades, vec![1, 2]);
//! assert_eq!(config.sections[&1], vec!["1", "2"]);
//! assert_eq!(config.days.len(), 6);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{Grade, SchoolConfiguration};

/// Default periods on weekdays.
pub const DEFAULT_DAILY_PERIODS: u32 = 6;
/// Default periods on Saturday.
pub const DEFAULT_SATURDAY_PERIODS: u32 = 4;
/// Default class count per grade.
pub const DEFAULT_GRADE_CLASS_COUNTS: [(Grade, u32); 3] = [(1, 4), (2, 4), (3, 3)];
/// Default teaching week.
pub const DEFAULT_DAYS: [&str; 6] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Raw, loosely typed school settings as received from storage or a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSettings {
    /// Grade list.
    pub grades: Option<Value>,
    /// Section labels per grade.
    pub sections: Option<Value>,
    /// Day labels.
    pub days: Option<Value>,
    /// Weekday period count.
    #[serde(alias = "periodsPerDay")]
    pub daily_periods: Option<Value>,
    /// Saturday period count.
    pub saturday_periods: Option<Value>,
    /// Class count per grade.
    #[serde(alias = "gradeClasses")]
    pub grade_class_counts: Option<Value>,
}

impl RawSettings {
    /// Reads settings from an arbitrary JSON value. Non-objects yield empty settings.
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }
}

/// Normalizes raw settings into a complete configuration.
///
/// `None` yields the full default configuration.
pub fn normalize_settings(raw: Option<&RawSettings>) -> SchoolConfiguration {
    let empty = RawSettings::default();
    let raw = raw.unwrap_or(&empty);

    let daily_periods = parse_count(raw.daily_periods.as_ref(), DEFAULT_DAILY_PERIODS, "dailyPeriods");
    let saturday_periods = parse_count(
        raw.saturday_periods.as_ref(),
        DEFAULT_SATURDAY_PERIODS,
        "saturdayPeriods",
    );
    let class_counts = parse_class_counts(raw.grade_class_counts.as_ref());
    let explicit_sections = parse_sections(raw.sections.as_ref());

    let grades = match raw.grades.as_ref().map(parse_grades) {
        Some(grades) if !grades.is_empty() => grades,
        _ if !explicit_sections.is_empty() => explicit_sections.keys().copied().collect(),
        _ => {
            debug!(field = "grades", "using grades from class counts");
            class_counts.keys().copied().collect()
        }
    };

    let sections = grades
        .iter()
        .map(|&grade| {
            let labels = match explicit_sections.get(&grade) {
                Some(labels) => labels.clone(),
                None => {
                    let count = class_counts.get(&grade).copied().unwrap_or(1);
                    (1..=count).map(|n| n.to_string()).collect()
                }
            };
            (grade, labels)
        })
        .collect();

    let days = match raw.days.as_ref().map(parse_labels) {
        Some(days) if !days.is_empty() => days,
        _ => {
            debug!(field = "days", "using default week");
            DEFAULT_DAYS.iter().map(|d| d.to_string()).collect()
        }
    };

    SchoolConfiguration {
        grades,
        sections,
        days,
        daily_periods,
        saturday_periods,
    }
}

/// Parses a positive count, falling back to `default`.
fn parse_count(value: Option<&Value>, default: u32, key: &str) -> u32 {
    match value.and_then(positive_number) {
        Some(n) => n,
        None => {
            if value.is_some() {
                debug!(key, default, "unusable count, using default");
            }
            default
        }
    }
}

fn positive_number(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|&n| n >= 1)
}

/// Splits a list-ish value into trimmed, non-empty labels.
///
/// Accepts JSON arrays (of strings or numbers) and comma-separated strings.
fn parse_labels(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

fn parse_grades(value: &Value) -> Vec<Grade> {
    let mut grades = Vec::new();
    for label in parse_labels(value) {
        if let Ok(g) = label.parse::<Grade>() {
            if !grades.contains(&g) {
                grades.push(g);
            }
        }
    }
    grades
}

fn parse_class_counts(value: Option<&Value>) -> BTreeMap<Grade, u32> {
    let parsed: BTreeMap<Grade, u32> = match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| Some((k.trim().parse::<Grade>().ok()?, positive_number(v)?)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| Some((i as Grade + 1, positive_number(v)?)))
            .collect(),
        _ => BTreeMap::new(),
    };
    if parsed.is_empty() {
        DEFAULT_GRADE_CLASS_COUNTS.into_iter().collect()
    } else {
        parsed
    }
}

fn parse_sections(value: Option<&Value>) -> BTreeMap<Grade, Vec<String>> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let grade = k.trim().parse::<Grade>().ok()?;
            let mut seen = HashSet::new();
            let labels: Vec<String> = parse_labels(v)
                .into_iter()
                .filter(|label| seen.insert(label.clone()))
                .collect();
            (!labels.is_empty()).then_some((grade, labels))
        })
        .collect()
}
