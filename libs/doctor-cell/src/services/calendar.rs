use chrono::{Datelike, NaiveDate};

use crate::models::{Doctor, WorkingHours, WorkingInterval};

/// Weekday index used by working-hours maps: 0 = Sunday .. 6 = Saturday.
///
/// `NaiveDate` carries no time zone, so this is the UTC calendar weekday of the date.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Answers "when does this doctor work on that date".
#[derive(Debug, Clone, Copy)]
pub struct WorkingHoursCalendar<'a> {
    hours: Option<&'a WorkingHours>,
}

impl<'a> WorkingHoursCalendar<'a> {
    /// An unknown doctor (`None`) never works.
    pub fn for_doctor(doctor: Option<&'a Doctor>) -> Self {
        Self {
            hours: doctor.map(|d| &d.working_hours),
        }
    }

    pub fn interval_for_weekday(&self, weekday: u8) -> Option<WorkingInterval> {
        self.hours.and_then(|hours| hours.interval_on(weekday))
    }

    pub fn interval_on(&self, date: NaiveDate) -> Option<WorkingInterval> {
        self.interval_for_weekday(weekday_index(date))
    }
}
