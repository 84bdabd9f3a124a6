use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorSummary, UpdateDoctorRequest, WorkingHours,
};

/// Directory of doctor profiles.
pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(result.into_iter().next())
    }

    /// Distinct specialties, sorted.
    pub async fn list_specialties(&self, auth_token: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct SpecialtyRow {
            specialty: Option<String>,
        }

        let rows: Vec<SpecialtyRow> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?select=specialty&specialty=not.is.null",
            Some(auth_token),
            None,
        ).await?;

        let specialties: BTreeSet<String> = rows
            .into_iter()
            .filter_map(|row| row.specialty)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(specialties.into_iter().collect())
    }

    pub async fn doctors_by_specialty(
        &self,
        specialty: &str,
        auth_token: &str,
    ) -> Result<Vec<DoctorSummary>> {
        debug!("Listing doctors with specialty: {}", specialty);

        let path = format!(
            "/rest/v1/doctors?select=id,full_name&specialty=eq.{}&order=full_name.asc",
            urlencoding::encode(specialty)
        );

        let doctors: Vec<DoctorSummary> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(doctors)
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest, auth_token: &str) -> Result<Doctor> {
        debug!("Creating doctor profile for: {}", request.email);

        let working_hours = request.working_hours.unwrap_or_default();
        let now = Utc::now().to_rfc3339();

        let doctor_data = json!({
            "id": request.id,
            "full_name": request.full_name,
            "email": request.email.trim().to_lowercase(),
            "specialty": request.specialty,
            "license_number": request.license_number,
            "phone": request.phone,
            "address": request.address,
            "working_hours": working_hours,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Store returned no doctor after insert"))?;

        info!("Doctor profile created: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Option<Doctor>> {
        debug!("Updating doctor profile: {}", doctor_id);

        let mut update_data = Map::new();
        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email.trim().to_lowercase()));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(license_number) = request.license_number {
            update_data.insert("license_number".to_string(), json!(license_number));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(url) = request.profile_image_url {
            update_data.insert("profile_image_url".to_string(), json!(url));
        }

        self.patch_doctor(doctor_id, update_data, auth_token).await
    }

    /// Replaces the whole weekly schedule. Callers validate `hours` first.
    pub async fn set_working_hours(
        &self,
        doctor_id: Uuid,
        hours: &WorkingHours,
        auth_token: &str,
    ) -> Result<Option<Doctor>> {
        info!("Replacing working hours for doctor {}", doctor_id);

        let mut update_data = Map::new();
        update_data.insert("working_hours".to_string(), serde_json::to_value(hours)?);

        self.patch_doctor(doctor_id, update_data, auth_token).await
    }

    /// Returns whether a row was removed.
    pub async fn delete_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<bool> {
        info!("Deleting doctor profile {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(!deleted.is_empty())
    }

    async fn patch_doctor(
        &self,
        doctor_id: Uuid,
        mut update_data: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Option<Doctor>> {
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(result.into_iter().next())
    }
}
