// libs/therapist-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateUnavailabilityRequest, TherapistError, TherapistSearchFilters};
use crate::services::therapist::TherapistService;
use crate::services::unavailability::UnavailabilityService;

#[derive(Debug, Deserialize)]
pub struct UnavailabilityQueryParams {
    pub date: NaiveDate,
}

fn map_therapist_error(e: TherapistError) -> AppError {
    match e {
        TherapistError::NotFound => AppError::NotFound("Therapist not found".to_string()),
        TherapistError::NotAccepting => {
            AppError::BadRequest("Therapist is not accepting new patients".to_string())
        }
        TherapistError::InvalidWindow(msg) => AppError::BadRequest(msg),
        TherapistError::WindowConflict => {
            AppError::Conflict("Unavailability window conflicts with an existing window".to_string())
        }
        TherapistError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_therapists(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(filters): Query<TherapistSearchFilters>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TherapistService::new(&state);

    let therapists = service.list_therapists(filters, token).await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({ "therapists": therapists })))
}

#[axum::debug_handler]
pub async fn get_therapist(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = TherapistService::new(&state);

    let therapist = service.get_therapist(therapist_id, token).await
        .map_err(map_therapist_error)?;

    Ok(Json(json!(therapist)))
}

#[axum::debug_handler]
pub async fn list_unavailability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    Query(params): Query<UnavailabilityQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = UnavailabilityService::new(&state);

    let windows = service.get_windows_for_date(therapist_id, params.date, token).await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({ "unavailability": windows })))
}

#[axum::debug_handler]
pub async fn create_unavailability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateUnavailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Only the therapist themselves or an admin may block the calendar
    let is_owner = therapist_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_owner && !is_admin {
        return Err(AppError::Auth("Not authorized to manage this therapist's calendar".to_string()));
    }

    let service = UnavailabilityService::new(&state);

    let window = service.create_window(therapist_id, request, token).await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "success": true,
        "unavailability": window
    })))
}

#[axum::debug_handler]
pub async fn delete_unavailability(
    State(state): State<Arc<AppConfig>>,
    Path((therapist_id, window_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_owner = therapist_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_owner && !is_admin {
        return Err(AppError::Auth("Not authorized to manage this therapist's calendar".to_string()));
    }

    let service = UnavailabilityService::new(&state);

    service.delete_window(window_id, token).await
        .map_err(map_therapist_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Unavailability window removed"
    })))
}
