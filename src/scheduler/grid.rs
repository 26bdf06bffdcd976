//! Slot grid construction.

use crate::error::Result;
use crate::models::{SchoolConfiguration, Timetable, TimetableSlot};

/// Builds the empty timetable for a configuration.
///
/// One slot per (day, period, grade, section). Saturday uses the Saturday
/// period count; every other day uses the daily count.
///
/// # Errors
/// [`TimetableError::InvalidConfiguration`](crate::TimetableError::InvalidConfiguration)
/// if the configuration has no days, grades, or sections, or a configured
/// day has zero periods.
pub fn build_grid(config: &SchoolConfiguration) -> Result<Timetable> {
    config.check()?;
    let classes = config.classes();

    let grid = config
        .days
        .iter()
        .map(|day| {
            (1..=config.periods_on(day))
                .map(|period| {
                    classes
                        .iter()
                        .map(|c| TimetableSlot::empty(c.grade, c.section.clone(), day.clone(), period))
                        .collect()
                })
                .collect()
        })
        .collect();

    Ok(Timetable::from_grid(grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        let config = SchoolConfiguration::new(["Mon", "Tue", "Sat"], 3)
            .with_saturday_periods(2)
            .with_grade(1, ["A", "B"])
            .with_grade(2, ["A"]);
        let grid = build_grid(&config).unwrap();

        assert_eq!(grid.grid.len(), 3);
        assert_eq!(grid.grid[0].len(), 3);
        assert_eq!(grid.grid[2].len(), 2);
        assert_eq!(grid.grid[0][0].len(), 3);
        assert_eq!(grid.total_slots(), (3 + 3 + 2) * 3);
        assert_eq!(grid.total_slots(), config.slot_count());
        assert_eq!(grid.assigned_slots(), 0);

        let slot = &grid.grid[2][1][2];
        assert_eq!(slot.day, "Sat");
        assert_eq!(slot.period, 2);
        assert_eq!(slot.grade, 2);
        assert_eq!(slot.section, "A");
    }

    #[test]
    fn test_invalid_configuration() {
        let config = SchoolConfiguration::new(Vec::<String>::new(), 3).with_grade(1, ["A"]);
        assert!(build_grid(&config).is_err());
    }
}
