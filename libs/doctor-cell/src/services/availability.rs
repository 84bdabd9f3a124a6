use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::BookedSlot;
use crate::services::calendar::WorkingHoursCalendar;
use crate::services::doctor::DoctorService;
use crate::services::resolver::AvailabilityResolver;

/// Free slots for one doctor on one date, read from the store.
pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctors: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    /// `editing` names an appointment being rescheduled; when it sits on this doctor
    /// and date its own time stays in the result.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        editing: Option<Uuid>,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let doctor = self.doctors.get_doctor(doctor_id, auth_token).await?;
        if doctor.is_none() {
            debug!("Doctor {} not found, no availability", doctor_id);
        }

        let Some(interval) = WorkingHoursCalendar::for_doctor(doctor.as_ref()).interval_on(date) else {
            debug!("Doctor {} does not work on {}", doctor_id, date);
            return Ok(Vec::new());
        };

        let booked = self.booked_slots(doctor_id, date, auth_token).await?;
        let keep = editing.and_then(|id| {
            booked.iter().find(|slot| slot.id == id).map(|slot| slot.appointment_time)
        });
        let booked_times: Vec<NaiveTime> = booked.iter().map(|slot| slot.appointment_time).collect();

        let available = AvailabilityResolver::new(now).resolve(date, Some(interval), &booked_times, keep);

        debug!("Found {} available slots", available.len());
        Ok(available)
    }

    pub async fn booked_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>> {
        let path = format!(
            "/rest/v1/appointments?select=id,appointment_time&doctor_id=eq.{}&appointment_date=eq.{}&order=appointment_time.asc",
            doctor_id,
            date.format("%Y-%m-%d")
        );

        let booked: Vec<BookedSlot> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(booked)
    }
}
