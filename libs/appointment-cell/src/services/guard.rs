use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, ConflictKind, SlotRequest};

#[derive(Debug, Deserialize)]
struct SlotHolder {
    id: Uuid,
}

/// True when someone other than `replacing` already holds the slot.
pub fn occupied_by_other(holders: &[Uuid], replacing: Option<Uuid>) -> bool {
    holders.iter().any(|id| Some(*id) != replacing)
}

/// Doctor double-booking is checked before patient double-booking.
pub fn detect_conflict(
    request: &SlotRequest,
    doctor_holders: &[Uuid],
    patient_holders: &[Uuid],
) -> Option<ConflictKind> {
    if occupied_by_other(doctor_holders, request.replacing) {
        Some(ConflictKind::Doctor)
    } else if occupied_by_other(patient_holders, request.replacing) {
        Some(ConflictKind::Patient)
    } else {
        None
    }
}

fn reject(request: &SlotRequest, kind: ConflictKind) -> AppointmentError {
    let party = match kind {
        ConflictKind::Doctor => request.doctor_id,
        ConflictKind::Patient => request.patient_id,
    };
    warn!("{} {} already booked on {} at {}", kind, party, request.date, request.time);
    AppointmentError::SlotConflict { kind }
}

/// Read-side check run before every appointment write.
///
/// Two requests racing for the same slot can both pass here; the unique
/// indexes on the appointments table reject the second write.
pub struct BookingGuard {
    supabase: Arc<SupabaseClient>,
}

impl BookingGuard {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn check(&self, request: &SlotRequest, auth_token: &str) -> Result<(), AppointmentError> {
        debug!(
            "Checking slot {} {} for doctor {} and patient {}",
            request.date, request.time, request.doctor_id, request.patient_id
        );

        let doctor_holders = self
            .holders("doctor_id", request.doctor_id, request, auth_token)
            .await?;
        if let Some(kind) = detect_conflict(request, &doctor_holders, &[]) {
            return Err(reject(request, kind));
        }

        let patient_holders = self
            .holders("patient_id", request.patient_id, request, auth_token)
            .await?;
        match detect_conflict(request, &doctor_holders, &patient_holders) {
            Some(kind) => Err(reject(request, kind)),
            None => Ok(()),
        }
    }

    async fn holders(
        &self,
        column: &str,
        party_id: Uuid,
        request: &SlotRequest,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=id&{}=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}",
            column,
            party_id,
            request.date.format("%Y-%m-%d"),
            request.time.format("%H:%M")
        );

        let rows: Vec<SlotHolder> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn slot(replacing: Option<Uuid>) -> SlotRequest {
        SlotRequest {
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            replacing,
        }
    }

    #[test]
    fn test_free_slot_passes() {
        assert_eq!(detect_conflict(&slot(None), &[], &[]), None);
    }

    #[test]
    fn test_doctor_conflict_regardless_of_patient() {
        let existing = Uuid::new_v4();
        assert_eq!(
            detect_conflict(&slot(None), &[existing], &[]),
            Some(ConflictKind::Doctor)
        );
        // Doctor wins when both dimensions collide
        assert_eq!(
            detect_conflict(&slot(None), &[existing], &[existing]),
            Some(ConflictKind::Doctor)
        );
    }

    #[test]
    fn test_patient_conflict_with_other_doctor() {
        assert_eq!(
            detect_conflict(&slot(None), &[], &[Uuid::new_v4()]),
            Some(ConflictKind::Patient)
        );
    }

    #[test]
    fn test_update_does_not_conflict_with_itself() {
        let own = Uuid::new_v4();
        assert_eq!(detect_conflict(&slot(Some(own)), &[own], &[own]), None);
    }

    #[test]
    fn test_update_still_conflicts_with_others() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(
            detect_conflict(&slot(Some(own)), &[own, other], &[own]),
            Some(ConflictKind::Doctor)
        );
        assert_eq!(
            detect_conflict(&slot(Some(own)), &[], &[other]),
            Some(ConflictKind::Patient)
        );
    }
}
