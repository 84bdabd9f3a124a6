//! Zero-padded 24-hour `HH:MM` wall-clock values.

use chrono::{NaiveTime, Timelike};

pub fn format_hhmm(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Parses `HH:MM`; `HH:MM:SS` is accepted as well since the store may hand back SQL times.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    let parsed = match value.len() {
        5 => NaiveTime::parse_from_str(value, "%H:%M"),
        8 => NaiveTime::parse_from_str(value, "%H:%M:%S"),
        _ => return Err(format!("Invalid time '{}', expected HH:MM", value)),
    };

    parsed.map_err(|_| format!("Invalid time '{}', expected HH:MM", value))
}

/// Drops seconds and below, so comparisons behave like `HH:MM` string comparisons.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).map_err(de::Error::custom)
    }
}

pub mod hhmm_vec {
    use chrono::NaiveTime;
    use serde::{ser::SerializeSeq, Serializer};

    pub fn serialize<S>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&super::format_hhmm(*time))?;
        }
        seq.end()
    }
}
