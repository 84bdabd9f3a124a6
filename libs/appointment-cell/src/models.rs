use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::SLOT_MINUTES;
use shared_models::clock::{format_hhmm, hhmm, parse_hhmm};
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    // Embedded by PostgREST when the listing asks for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<PartySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PartySummary>,
}

impl Appointment {
    /// Local date and time the appointment starts at.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySummary {
    pub id: Uuid,
    pub full_name: String,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// Raw `HH:MM`; validated by [`parse_slot_time`].
    pub time: String,
    /// Required when staff book on behalf of a patient, ignored for patients.
    pub patient_id: Option<Uuid>,
    pub reason: Option<String>,
}

pub type UpdateAppointmentRequest = BookAppointmentRequest;

/// A slot someone wants to occupy. `replacing` names the appointment being moved, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub replacing: Option<Uuid>,
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientAppointments {
    pub upcoming: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorSchedule {
    pub today: Vec<Appointment>,
    pub upcoming: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Doctor,
    Patient,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Doctor => write!(f, "doctor"),
            ConflictKind::Patient => write!(f, "patient"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("The {kind} already has an appointment at that date and time")]
    SlotConflict { kind: ConflictKind },

    #[error("Not allowed to change this appointment")]
    Unauthorized,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot change state: {0}")]
    InvalidStatusTransition(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(error.to_string()),
            AppointmentError::SlotConflict { .. } => AppError::Conflict(error.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(error.to_string()),
            AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidStatusTransition(_) => AppError::BadRequest(error.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(detail) => AppError::store_failure(detail),
        }
    }
}

/// Accepts only zero-padded `HH:MM` on a slot boundary.
pub fn parse_slot_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return Err(AppointmentError::InvalidTime(format!("'{}' is not HH:MM", raw)));
    }

    let time = parse_hhmm(raw).map_err(AppointmentError::InvalidTime)?;
    if i64::from(time.minute()) % SLOT_MINUTES != 0 {
        return Err(AppointmentError::InvalidTime(format!(
            "{} is not on a {}-minute boundary",
            format_hhmm(time),
            SLOT_MINUTES
        )));
    }

    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_slot_time() {
        assert_eq!(parse_slot_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_slot_time(" 14:00 ").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());

        assert_matches!(parse_slot_time("9:30"), Err(AppointmentError::InvalidTime(_)));
        assert_matches!(parse_slot_time("09:15"), Err(AppointmentError::InvalidTime(_)));
        assert_matches!(parse_slot_time("24:00"), Err(AppointmentError::InvalidTime(_)));
        assert_matches!(parse_slot_time("09:30:00"), Err(AppointmentError::InvalidTime(_)));
    }

    #[test]
    fn test_conflict_message_names_dimension() {
        let doctor = AppointmentError::SlotConflict { kind: ConflictKind::Doctor };
        let patient = AppointmentError::SlotConflict { kind: ConflictKind::Patient };

        assert_eq!(doctor.to_string(), "The doctor already has an appointment at that date and time");
        assert!(patient.to_string().starts_with("The patient"));
    }

    #[test]
    fn test_error_status_mapping() {
        use axum::http::StatusCode;

        let cases = [
            (AppointmentError::NotFound, StatusCode::NOT_FOUND),
            (AppointmentError::PatientNotFound, StatusCode::NOT_FOUND),
            (AppointmentError::SlotConflict { kind: ConflictKind::Doctor }, StatusCode::CONFLICT),
            (AppointmentError::Unauthorized, StatusCode::FORBIDDEN),
            (AppointmentError::InvalidTime("x".into()), StatusCode::BAD_REQUEST),
            (AppointmentError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (AppointmentError::DatabaseError("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_appointment_row_deserializes() {
        let row = serde_json::json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "appointment_date": "2025-06-02",
            "appointment_time": "09:00",
            "reason": null,
            "completed_at": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "doctor": { "id": Uuid::new_v4(), "full_name": "Dra. López" }
        });

        let appointment: Appointment = serde_json::from_value(row).unwrap();
        assert_eq!(
            appointment.starts_at(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(appointment.doctor.as_ref().unwrap().full_name, "Dra. López");
        assert!(appointment.patient.is_none());
        assert!(!appointment.is_completed());
    }
}
