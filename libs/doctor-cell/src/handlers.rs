use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthContext, Capability};
use shared_models::error::AppError;

use crate::models::{
    AvailabilityQuery, AvailabilityResponse, CreateDoctorRequest, DoctorError,
    UpdateDoctorRequest, WorkingHours,
};
use crate::services::{AvailabilityService, DoctorService};

fn doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
    }
}

// ==============================================================================
// DIRECTORY
// ==============================================================================

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let specialties = DoctorService::new(&state)
        .list_specialties(auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(json!({ "specialties": specialties })))
}

#[axum::debug_handler]
pub async fn doctors_by_specialty(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(specialty), _): WithRejection<Path<String>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(&state)
        .doctors_by_specialty(&specialty, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state)
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or_else(|| doctor_error(DoctorError::NotFound))?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path((doctor_id, date)), _): WithRejection<Path<(Uuid, NaiveDate)>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<AvailabilityQuery>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available = AvailabilityService::new(&state)
        .available_slots(doctor_id, date, query.editing, state.clinic_now(), auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(AvailabilityResponse { available }))
}

#[axum::debug_handler]
pub async fn get_working_hours(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<WorkingHours>, AppError> {
    let doctor = DoctorService::new(&state)
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or_else(|| doctor_error(DoctorError::NotFound))?;

    Ok(Json(doctor.working_hours))
}

#[axum::debug_handler]
pub async fn set_working_hours(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Json(hours), _): WithRejection<Json<WorkingHours>, AppError>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::ManageUsers)?;
    hours.validate().map_err(doctor_error)?;

    let doctor = DoctorService::new(&state)
        .set_working_hours(doctor_id, &hours, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or_else(|| doctor_error(DoctorError::NotFound))?;

    Ok(Json(json!({
        "success": true,
        "working_hours": doctor.working_hours,
        "message": "Working hours updated"
    })))
}

// ==============================================================================
// PROFILE MANAGEMENT (ADMIN)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Json(request), _): WithRejection<Json<CreateDoctorRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::ManageUsers)?;

    if request.full_name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(AppError::ValidationError("Name and email are required".to_string()));
    }
    if let Some(hours) = &request.working_hours {
        hours.validate().map_err(doctor_error)?;
    }

    let doctor = DoctorService::new(&state)
        .create_doctor(request, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor profile created"
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateDoctorRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::ManageUsers)?;

    let doctor = DoctorService::new(&state)
        .update_doctor(doctor_id, request, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or_else(|| doctor_error(DoctorError::NotFound))?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor profile updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::ManageUsers)?;

    if ctx.is(doctor_id) {
        return Err(AppError::Forbidden("You cannot delete your own account".to_string()));
    }

    let deleted = DoctorService::new(&state)
        .delete_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    if !deleted {
        return Err(doctor_error(DoctorError::NotFound));
    }

    info!("Doctor {} deleted by {}", doctor_id, ctx.user_id);
    Ok(Json(json!({
        "success": true,
        "message": "Doctor profile deleted"
    })))
}
