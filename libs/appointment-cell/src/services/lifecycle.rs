use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use shared_models::auth::{AuthContext, Capability, Role};

use crate::models::{Appointment, AppointmentError, DoctorSchedule, PatientAppointments};

/// Who may see or change an appointment, when it may be completed, and how
/// listings are split around the clinic's current day.
pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// The patient it belongs to, the doctor it is with, or front-desk staff.
    pub fn can_view(&self, ctx: &AuthContext, appointment: &Appointment) -> bool {
        match ctx.role {
            Role::Patient => ctx.is(appointment.patient_id),
            Role::Doctor => ctx.is(appointment.doctor_id),
            Role::Receptionist | Role::Admin => ctx.can(Capability::ManageAppointments),
        }
    }

    /// Reschedule and cancel. Doctors can see their appointments but not move them.
    pub fn can_modify(&self, ctx: &AuthContext, appointment: &Appointment) -> bool {
        if ctx.can(Capability::ManageAppointments) {
            return true;
        }
        ctx.can(Capability::BookOwnAppointments) && ctx.is(appointment.patient_id)
    }

    /// Not-visible reads as not found so a patient cannot probe other patients' ids.
    pub fn authorize_modification(
        &self,
        ctx: &AuthContext,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        if !self.can_view(ctx, appointment) {
            return Err(AppointmentError::NotFound);
        }
        if !self.can_modify(ctx, appointment) {
            warn!("{} {} tried to modify appointment {}", ctx.role, ctx.user_id, appointment.id);
            return Err(AppointmentError::Unauthorized);
        }
        Ok(())
    }

    pub fn validate_completion(
        &self,
        appointment: &Appointment,
        now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        debug!("Validating completion of appointment {}", appointment.id);

        if appointment.is_completed() {
            return Err(AppointmentError::InvalidStatusTransition(
                "appointment is already completed".to_string(),
            ));
        }

        if appointment.starts_at() > now {
            return Err(AppointmentError::InvalidStatusTransition(
                "appointment has not taken place yet".to_string(),
            ));
        }

        Ok(())
    }

    /// A completed visit stays where it happened.
    pub fn validate_reschedule(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        if appointment.is_completed() {
            return Err(AppointmentError::InvalidStatusTransition(
                "completed appointments cannot be changed".to_string(),
            ));
        }
        Ok(())
    }

    /// Upcoming is today and later; both halves ascend by date then time.
    pub fn split_for_patient(
        &self,
        mut appointments: Vec<Appointment>,
        today: NaiveDate,
    ) -> PatientAppointments {
        sort_chronologically(&mut appointments);
        let (upcoming, past) = appointments
            .into_iter()
            .partition(|a| a.appointment_date >= today);

        PatientAppointments { upcoming, past }
    }

    /// Earlier days are dropped.
    pub fn split_for_doctor(
        &self,
        mut appointments: Vec<Appointment>,
        today: NaiveDate,
    ) -> DoctorSchedule {
        appointments.retain(|a| a.appointment_date >= today);
        sort_chronologically(&mut appointments);
        let (today, upcoming) = appointments
            .into_iter()
            .partition(|a| a.appointment_date == today);

        DoctorSchedule { today, upcoming }
    }
}

pub fn sort_chronologically(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| (a.appointment_date, a.appointment_time));
}
