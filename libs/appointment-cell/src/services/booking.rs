use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::{ForeignKeyViolation, SupabaseClient, UniqueViolation};
use shared_models::auth::{AuthContext, Capability, Role};

use crate::models::{
    parse_slot_time, Appointment, AppointmentError, BookAppointmentRequest, ConflictKind,
    DoctorSchedule, PatientAppointments, SlotRequest, UpdateAppointmentRequest,
};
use crate::services::guard::BookingGuard;
use crate::services::lifecycle::{sort_chronologically, AppointmentLifecycleService};

const APPOINTMENT_SELECT: &str = "*,doctor:doctors(id,full_name),patient:patients(id,full_name)";

const PATIENT_SLOT_INDEX: &str = "appointments_patient_slot_key";

/// Store failures, with unique-index rejections surfaced as slot conflicts
/// and dangling references as missing parties.
fn store_error(error: anyhow::Error) -> AppointmentError {
    if let Some(violation) = error.downcast_ref::<UniqueViolation>() {
        warn!("Store rejected a double booking: {}", violation);
        let kind = if violation.constraint == PATIENT_SLOT_INDEX {
            ConflictKind::Patient
        } else {
            ConflictKind::Doctor
        };
        return AppointmentError::SlotConflict { kind };
    }

    if let Some(violation) = error.downcast_ref::<ForeignKeyViolation>() {
        warn!("Store rejected a write: {}", violation);
        return match violation.column.as_str() {
            "patient_id" => AppointmentError::PatientNotFound,
            "doctor_id" => AppointmentError::DoctorNotFound,
            _ => AppointmentError::DatabaseError(error.to_string()),
        };
    }

    AppointmentError::DatabaseError(error.to_string())
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    guard: BookingGuard,
    lifecycle: AppointmentLifecycleService,
    doctors: DoctorService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            guard: BookingGuard::new(Arc::clone(&supabase)),
            lifecycle: AppointmentLifecycleService::new(),
            doctors: DoctorService::new(config),
            supabase,
        }
    }

    // ==========================================================================
    // WRITES
    // ==========================================================================

    pub async fn book_appointment(
        &self,
        ctx: &AuthContext,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = self.booking_patient(ctx, request.patient_id)?;
        let time = parse_slot_time(&request.time)?;
        debug!("Booking doctor {} on {} at {} for patient {}", request.doctor_id, request.date, request.time, patient_id);

        self.verify_doctor_exists(request.doctor_id, auth_token).await?;
        self.verify_patient_exists(patient_id, auth_token).await?;

        let slot = SlotRequest {
            doctor_id: request.doctor_id,
            patient_id,
            date: request.date,
            time,
            replacing: None,
        };
        self.guard.check(&slot, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.date.format("%Y-%m-%d").to_string(),
            "appointment_time": time.format("%H:%M").to_string(),
            "reason": clean_reason(request.reason),
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(store_error)?;

        let appointment = result.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("No appointment returned after insert".to_string()))?;

        info!("Appointment {} booked by {} {}", appointment.id, ctx.role, ctx.user_id);
        Ok(appointment)
    }

    /// Reschedule or edit an appointment in place. The guard ignores the appointment's own row.
    pub async fn update_appointment(
        &self,
        ctx: &AuthContext,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.fetch_appointment(appointment_id, auth_token).await?;
        self.lifecycle.authorize_modification(ctx, &existing)?;
        self.lifecycle.validate_reschedule(&existing)?;

        let time = parse_slot_time(&request.time)?;
        let patient_id = if ctx.can(Capability::ManageAppointments) {
            request.patient_id.unwrap_or(existing.patient_id)
        } else {
            existing.patient_id
        };

        if request.doctor_id != existing.doctor_id {
            self.verify_doctor_exists(request.doctor_id, auth_token).await?;
        }
        if patient_id != existing.patient_id {
            self.verify_patient_exists(patient_id, auth_token).await?;
        }

        let slot = SlotRequest {
            doctor_id: request.doctor_id,
            patient_id,
            date: request.date,
            time,
            replacing: Some(appointment_id),
        };
        self.guard.check(&slot, auth_token).await?;

        let update_data = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.date.format("%Y-%m-%d").to_string(),
            "appointment_time": time.format("%H:%M").to_string(),
            "reason": clean_reason(request.reason),
            "updated_at": Utc::now().to_rfc3339()
        });

        let appointment = self.patch_appointment(appointment_id, update_data, auth_token).await?;
        info!("Appointment {} updated by {} {}", appointment_id, ctx.role, ctx.user_id);
        Ok(appointment)
    }

    /// Deletes the row, so the slot is free again straight away.
    pub async fn cancel_appointment(
        &self,
        ctx: &AuthContext,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.fetch_appointment(appointment_id, auth_token).await?;
        self.lifecycle.authorize_modification(ctx, &existing)?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let deleted: Vec<Appointment> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::return_representation()),
        ).await.map_err(store_error)?;

        let appointment = deleted.into_iter().next().ok_or(AppointmentError::NotFound)?;
        info!("Appointment {} cancelled by {} {}", appointment_id, ctx.role, ctx.user_id);
        Ok(appointment)
    }

    pub async fn complete_appointment(
        &self,
        ctx: &AuthContext,
        appointment_id: Uuid,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if !ctx.can(Capability::CompleteAppointments) {
            return Err(AppointmentError::Unauthorized);
        }

        let existing = self.fetch_appointment(appointment_id, auth_token).await?;
        if !self.lifecycle.can_view(ctx, &existing) {
            return Err(AppointmentError::NotFound);
        }
        self.lifecycle.validate_completion(&existing, now)?;

        let update_data = json!({
            "completed_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let appointment = self.patch_appointment(appointment_id, update_data, auth_token).await?;
        info!("Appointment {} completed by {} {}", appointment_id, ctx.role, ctx.user_id);
        Ok(appointment)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_appointment(
        &self,
        ctx: &AuthContext,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        if !self.lifecycle.can_view(ctx, &appointment) {
            return Err(AppointmentError::NotFound);
        }
        Ok(appointment)
    }

    pub async fn patient_appointments(
        &self,
        ctx: &AuthContext,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<PatientAppointments, AppointmentError> {
        if !ctx.can(Capability::BookOwnAppointments) {
            return Err(AppointmentError::Unauthorized);
        }

        let filter = format!("patient_id=eq.{}", ctx.user_id);
        let appointments = self.list_appointments(&filter, auth_token).await?;
        Ok(self.lifecycle.split_for_patient(appointments, today))
    }

    pub async fn doctor_schedule(
        &self,
        ctx: &AuthContext,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorSchedule, AppointmentError> {
        if !ctx.can(Capability::ViewDoctorSchedule) {
            return Err(AppointmentError::Unauthorized);
        }

        let filter = format!(
            "doctor_id=eq.{}&appointment_date=gte.{}",
            ctx.user_id,
            today.format("%Y-%m-%d")
        );
        let appointments = self.list_appointments(&filter, auth_token).await?;
        Ok(self.lifecycle.split_for_doctor(appointments, today))
    }

    /// Front-desk view of everything from `today` on.
    pub async fn upcoming_appointments(
        &self,
        ctx: &AuthContext,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !ctx.can(Capability::ManageAppointments) {
            return Err(AppointmentError::Unauthorized);
        }

        let filter = format!("appointment_date=gte.{}", today.format("%Y-%m-%d"));
        let mut appointments = self.list_appointments(&filter, auth_token).await?;
        sort_chronologically(&mut appointments);
        Ok(appointments)
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    fn booking_patient(&self, ctx: &AuthContext, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
        match ctx.role {
            Role::Patient => Ok(ctx.user_id),
            _ if ctx.can(Capability::ManageAppointments) => requested.ok_or_else(|| {
                AppointmentError::ValidationError("No patient selected".to_string())
            }),
            _ => Err(AppointmentError::Unauthorized),
        }
    }

    async fn verify_doctor_exists(&self, doctor_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let doctor = self.doctors.get_doctor(doctor_id, auth_token).await.map_err(store_error)?;
        if doctor.is_none() {
            return Err(AppointmentError::DoctorNotFound);
        }
        Ok(())
    }

    async fn verify_patient_exists(&self, patient_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(store_error)?;

        if result.is_empty() {
            return Err(AppointmentError::PatientNotFound);
        }
        Ok(())
    }

    async fn fetch_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select={}",
            appointment_id, APPOINTMENT_SELECT
        );
        let result: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(store_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn list_appointments(&self, filter: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select={}&{}&order=appointment_date.asc,appointment_time.asc",
            APPOINTMENT_SELECT, filter
        );

        self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(store_error)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(store_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn clean_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}
