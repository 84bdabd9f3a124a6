use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use shared_models::clock::truncate_to_minute;

use crate::models::WorkingInterval;
use crate::services::slots::SlotGenerator;

/// Turns a working interval plus the day's bookings into the list of free slots.
///
/// `now` is the clinic's wall-clock time; on that calendar day only slots strictly
/// later than the current minute are offered.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityResolver {
    now: NaiveDateTime,
}

impl AvailabilityResolver {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// `keep` is the current time of an appointment being edited on this doctor and date.
    /// It is offered even though it is booked (by itself) and even if it already passed.
    pub fn resolve(
        &self,
        date: NaiveDate,
        interval: Option<WorkingInterval>,
        booked: &[NaiveTime],
        keep: Option<NaiveTime>,
    ) -> Vec<NaiveTime> {
        let Some(interval) = interval else {
            return Vec::new();
        };

        let taken: BTreeSet<NaiveTime> = booked.iter().copied().map(truncate_to_minute).collect();
        let keep = keep.map(truncate_to_minute);

        let mut slots: Vec<NaiveTime> = SlotGenerator::new(interval)
            .slots()
            .filter(|slot| !taken.contains(slot))
            .collect();

        if let Some(own) = keep {
            if !slots.contains(&own) {
                slots.push(own);
                slots.sort();
            }
        }

        if date == self.now.date() {
            let cutoff = truncate_to_minute(self.now.time());
            slots.retain(|slot| *slot > cutoff || Some(*slot) == keep);
        }

        slots
    }
}
