use chrono::{Duration, NaiveTime};

use crate::models::{WorkingInterval, SLOT_MINUTES};

/// Enumerates slot start times inside a working interval.
///
/// Starts at `start`, steps by [`SLOT_MINUTES`], and stops before reaching `end`.
/// Cloning or calling [`SlotGenerator::slots`] again restarts the sequence.
#[derive(Debug, Clone, Copy)]
pub struct SlotGenerator {
    interval: WorkingInterval,
    step: Duration,
}

impl SlotGenerator {
    pub fn new(interval: WorkingInterval) -> Self {
        Self {
            interval,
            step: Duration::minutes(SLOT_MINUTES),
        }
    }

    pub fn slots(&self) -> Slots {
        Slots {
            next: Some(self.interval.start),
            end: self.interval.end,
            step: self.step,
        }
    }
}

impl IntoIterator for &SlotGenerator {
    type Item = NaiveTime;
    type IntoIter = Slots;

    fn into_iter(self) -> Slots {
        self.slots()
    }
}

#[derive(Debug, Clone)]
pub struct Slots {
    next: Option<NaiveTime>,
    end: NaiveTime,
    step: Duration,
}

impl Iterator for Slots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<NaiveTime> {
        let current = self.next.take()?;
        if current >= self.end {
            return None;
        }

        // Stepping past midnight ends the day.
        let (advanced, wrapped_secs) = current.overflowing_add_signed(self.step);
        if wrapped_secs == 0 {
            self.next = Some(advanced);
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::clock::format_hhmm;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn generate(start: NaiveTime, end: NaiveTime) -> Vec<String> {
        SlotGenerator::new(WorkingInterval { start, end })
            .slots()
            .map(format_hhmm)
            .collect()
    }

    #[test]
    fn test_morning_shift() {
        assert_eq!(
            generate(t(9, 0), t(13, 0)),
            vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30"]
        );
    }

    #[test]
    fn test_last_slot_strictly_before_end() {
        assert_eq!(generate(t(9, 0), t(10, 15)), vec!["09:00", "09:30", "10:00"]);
        assert_eq!(generate(t(9, 0), t(9, 30)), vec!["09:00"]);
    }

    #[test]
    fn test_minutes_carry_into_next_hour() {
        assert_eq!(generate(t(9, 45), t(11, 0)), vec!["09:45", "10:15", "10:45"]);
    }

    #[test]
    fn test_empty_or_inverted_interval_yields_nothing() {
        assert!(generate(t(9, 0), t(9, 0)).is_empty());
        assert!(generate(t(12, 0), t(9, 0)).is_empty());
    }

    #[test]
    fn test_stops_at_midnight() {
        assert_eq!(generate(t(23, 0), t(23, 59)), vec!["23:00", "23:30"]);
    }

    #[test]
    fn test_count_spacing_and_bounds() {
        let cases = [(t(8, 0), t(17, 0)), (t(9, 0), t(13, 0)), (t(7, 30), t(8, 0)), (t(6, 0), t(23, 30))];

        for (start, end) in cases {
            let slots: Vec<NaiveTime> = SlotGenerator::new(WorkingInterval { start, end }).slots().collect();
            let minutes = (end - start).num_minutes();
            let expected = (minutes + SLOT_MINUTES - 1) / SLOT_MINUTES;

            assert_eq!(slots.len() as i64, expected);
            assert_eq!(slots.first(), Some(&start));
            assert!(*slots.last().unwrap() < end);
            for pair in slots.windows(2) {
                assert_eq!((pair[1] - pair[0]).num_minutes(), SLOT_MINUTES);
            }
        }
    }

    #[test]
    fn test_restartable() {
        let generator = SlotGenerator::new(WorkingInterval { start: t(9, 0), end: t(11, 0) });
        let first: Vec<_> = generator.slots().collect();
        let second: Vec<_> = (&generator).into_iter().collect();
        assert_eq!(first, second);
    }
}
