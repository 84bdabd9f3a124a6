use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::clock::{format_hhmm, hhmm, hhmm_vec};

/// Width of a bookable slot, in minutes.
pub const SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub working_hours: WorkingHours,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
}

/// A doctor's working time on one weekday, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingInterval {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl WorkingInterval {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.start >= self.end {
            return Err(DoctorError::ValidationError(format!(
                "Working hours must start before they end ({} - {})",
                format_hhmm(self.start),
                format_hhmm(self.end)
            )));
        }
        Ok(())
    }
}

/// Weekday index (0 = Sunday .. 6 = Saturday) to working interval.
/// A missing weekday means the doctor does not work that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(pub BTreeMap<u8, WorkingInterval>);

impl Default for WorkingHours {
    fn default() -> Self {
        Self::default_schedule()
    }
}

impl WorkingHours {
    /// Monday to Thursday 09:00-17:00, Friday 09:00-13:00.
    pub fn default_schedule() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        let full_day = WorkingInterval { start: at(9), end: at(17) };
        let half_day = WorkingInterval { start: at(9), end: at(13) };

        let mut days = BTreeMap::new();
        for weekday in 1..=4 {
            days.insert(weekday, full_day);
        }
        days.insert(5, half_day);
        Self(days)
    }

    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn interval_on(&self, weekday: u8) -> Option<WorkingInterval> {
        self.0.get(&weekday).copied()
    }

    pub fn set(&mut self, weekday: u8, interval: WorkingInterval) {
        self.0.insert(weekday, interval);
    }

    pub fn validate(&self) -> Result<(), DoctorError> {
        for (weekday, interval) in &self.0 {
            if *weekday > 6 {
                return Err(DoctorError::ValidationError(format!(
                    "Weekday {} is out of range, expected 0 (Sunday) to 6 (Saturday)",
                    weekday
                )));
            }
            interval.validate()?;
        }
        Ok(())
    }
}

/// Minimal appointment row needed to know which slots are taken.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlot {
    pub id: Uuid,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    /// Appointment being edited; its own slot stays selectable.
    pub editing: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    #[serde(serialize_with = "hhmm_vec::serialize")]
    pub available: Vec<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    /// Account id issued by the identity provider.
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub working_hours: Option<WorkingHours>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),
}
