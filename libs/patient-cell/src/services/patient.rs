use anyhow::Result;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    normalize_search_term, CreatePatientRequest, Patient, PatientSummary, UpdatePatientRequest,
    SEARCH_LIMIT,
};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn email_taken(&self, email: &str, auth_token: &str) -> Result<bool> {
        let path = format!(
            "/rest/v1/patients?select=id&email=eq.{}",
            urlencoding::encode(&email.trim().to_lowercase())
        );
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(!existing.is_empty())
    }

    pub async fn create_patient(
        &self,
        patient_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Creating new patient profile for: {}", request.email);

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "id": patient_id,
            "full_name": request.full_name.trim(),
            "email": request.email.trim().to_lowercase(),
            "phone": request.phone,
            "address": request.address,
            "date_of_birth": request.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            "insurance_number": request.insurance_number,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Patient> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let patient = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Failed to create patient profile"))?;

        info!("Patient profile created with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<Patient>> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(result.into_iter().next())
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Option<Patient>> {
        debug!("Updating patient profile: {}", patient_id);

        let mut update_data = Map::new();
        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name.trim()));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email.trim().to_lowercase()));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(date_of_birth.format("%Y-%m-%d").to_string()));
        }
        if let Some(insurance_number) = request.insurance_number {
            update_data.insert("insurance_number".to_string(), json!(insurance_number));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(result.into_iter().next())
    }

    /// Returns whether a row was removed. Appointments go with it through the foreign key.
    pub async fn delete_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<bool> {
        info!("Deleting patient profile {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(!deleted.is_empty())
    }

    /// Case-insensitive match on name or email. Short terms return nothing without a store call.
    pub async fn search_patients(&self, term: &str, auth_token: &str) -> Result<Vec<PatientSummary>> {
        let Some(term) = normalize_search_term(term) else {
            debug!("Search term too short, skipping store lookup");
            return Ok(Vec::new());
        };
        debug!("Searching patients matching: {}", term);

        let pattern = urlencoding::encode(&term);
        let path = format!(
            "/rest/v1/patients?select=id,full_name,email&or=(full_name.ilike.*{0}*,email.ilike.*{0}*)&order=full_name.asc&limit={1}",
            pattern, SEARCH_LIMIT
        );

        let mut patients: Vec<PatientSummary> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        patients.truncate(SEARCH_LIMIT);
        Ok(patients)
    }
}
