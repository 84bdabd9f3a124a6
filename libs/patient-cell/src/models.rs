use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

/// Shortest term the patient search will send to the store.
pub const MIN_SEARCH_CHARS: usize = 3;
pub const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub insurance_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    /// Defaults to the caller's own id.
    pub id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub insurance_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub insurance_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Date of birth cannot be in the future")]
    InvalidDateOfBirth,

    #[error("Unauthorized access to patient data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<PatientError> for AppError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::NotFound => AppError::NotFound(error.to_string()),
            PatientError::EmailAlreadyExists { .. } => AppError::Conflict(error.to_string()),
            PatientError::InvalidDateOfBirth => AppError::ValidationError(error.to_string()),
            PatientError::Unauthorized => AppError::Forbidden(error.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        }
    }
}

/// Strips characters PostgREST treats as filter syntax. `None` when too short to search.
pub fn normalize_search_term(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '"' | '\\'))
        .collect();

    (cleaned.chars().count() >= MIN_SEARCH_CHARS).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_terms_are_not_searched() {
        assert_eq!(normalize_search_term(""), None);
        assert_eq!(normalize_search_term("  an "), None);
        assert_eq!(normalize_search_term("a,(b)"), None);
    }

    #[test]
    fn test_search_term_is_cleaned() {
        assert_eq!(normalize_search_term(" ana "), Some("ana".to_string()));
        assert_eq!(normalize_search_term("ló*pez"), Some("lópez".to_string()));
        assert_eq!(normalize_search_term("ana@mail,x"), Some("ana@mailx".to_string()));
    }
}
