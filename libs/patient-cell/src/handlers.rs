use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthContext, Capability, Role};
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery, PatientError};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Json(request), _): WithRejection<Json<CreatePatientRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    let patient_id = request.id.unwrap_or(ctx.user_id);
    let registering_self = ctx.is(patient_id) && ctx.role == Role::Patient;
    if !registering_self {
        ctx.require(Capability::ManageUsers)?;
    }

    if request.full_name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(PatientError::ValidationError("Name and email are required".to_string()).into());
    }
    if request.date_of_birth.is_some_and(|dob| dob > config.clinic_now().date()) {
        return Err(PatientError::InvalidDateOfBirth.into());
    }

    let service = PatientService::new(&config);
    if service.email_taken(&request.email, auth.token()).await.map_err(AppError::store_failure)? {
        return Err(PatientError::EmailAlreadyExists { email: request.email }.into());
    }

    let patient = service.create_patient(patient_id, request, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient profile created"
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    if !ctx.is(patient_id) && !ctx.role.is_staff() {
        return Err(PatientError::Unauthorized.into());
    }

    let patient = PatientService::new(&config)
        .get_patient(patient_id, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or(PatientError::NotFound)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePatientRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    if !ctx.is(patient_id) && !ctx.can(Capability::ManageUsers) {
        return Err(PatientError::Unauthorized.into());
    }
    if request.date_of_birth.is_some_and(|dob| dob > config.clinic_now().date()) {
        return Err(PatientError::InvalidDateOfBirth.into());
    }

    let patient = PatientService::new(&config)
        .update_patient(patient_id, request, auth.token())
        .await
        .map_err(AppError::store_failure)?
        .ok_or(PatientError::NotFound)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient profile updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::ManageUsers)?;
    if ctx.is(patient_id) {
        return Err(AppError::Forbidden("You cannot delete your own account".to_string()));
    }

    let deleted = PatientService::new(&config)
        .delete_patient(patient_id, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    if !deleted {
        return Err(PatientError::NotFound.into());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Patient profile deleted"
    })))
}

/// Front-desk lookup used when booking on a patient's behalf.
#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(ctx): Extension<AuthContext>,
    WithRejection(Query(query), _): WithRejection<Query<PatientSearchQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    ctx.require(Capability::SearchPatients)?;

    let term = query.search.unwrap_or_default();
    let patients = PatientService::new(&config)
        .search_patients(&term, auth.token())
        .await
        .map_err(AppError::store_failure)?;

    Ok(Json(json!(patients)))
}
