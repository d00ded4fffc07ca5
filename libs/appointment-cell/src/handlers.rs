// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, BookAppointmentRequest,
    CancelAppointmentRequest, ConfirmBookingRequest, RescheduleAppointmentRequest, SlotQuery,
};
use crate::services::booking::BookingService;
use crate::services::slots::SlotService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub step_minutes: Option<i32>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub patient_id: Option<Uuid>,
    pub therapist_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::SlotTaken => {
            AppError::Conflict("The selected slot is no longer available".to_string())
        }
        AppointmentError::TherapistNotFound => {
            AppError::NotFound("Therapist not found".to_string())
        }
        AppointmentError::TherapistNotAccepting => {
            AppError::BadRequest("Therapist is not accepting new patients".to_string())
        }
        AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
        AppointmentError::InvalidStatusTransition(status) => AppError::BadRequest(format!(
            "Appointment cannot be modified in its current status: {}",
            status
        )),
        AppointmentError::PaymentVerificationFailed => {
            AppError::BadRequest("Payment verification failed".to_string())
        }
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::ExternalServiceError(msg) => AppError::ExternalService(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_day_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let slot_service = SlotService::new(&state);

    let query = SlotQuery {
        therapist_id: params.therapist_id,
        date: params.date,
        step_minutes: params.step_minutes,
        duration_minutes: params.duration_minutes,
    };

    let slots = slot_service.day_slots(&query, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "therapist_id": params.therapist_id,
        "date": params.date,
        "available": slots.available,
        "unavailable": slots.unavailable
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Phase one: validate the slot and create a payment order. The calendar
/// is untouched until the payment callback confirms.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Only the patient themselves or an admin can start a booking
    let is_patient = request.patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_admin {
        return Err(AppError::Auth("Not authorized to book for this patient".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let initiation = booking_service.initiate_booking(request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": initiation,
        "message": "Complete the payment to confirm your session"
    })))
}

/// Phase two: the checkout widget succeeded. Verify the signature and
/// commit the appointment.
#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = request.patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_admin {
        return Err(AppError::Auth("Not authorized to confirm this booking".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let appointment = booking_service.confirm_booking(request, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = BookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    // Only a participant or an admin may read an appointment
    let is_patient = appointment.patient_id.to_string() == user.id;
    let is_therapist = appointment.therapist_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_therapist && !is_admin {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Non-admins only see their own calendar, whichever side they are on
    let is_admin = user.role.as_deref() == Some("admin");
    if !is_admin {
        let owns_patient_filter = params.patient_id
            .map(|id| id.to_string() == user.id)
            .unwrap_or(false);
        let owns_therapist_filter = params.therapist_id
            .map(|id| id.to_string() == user.id)
            .unwrap_or(false);

        if !owns_patient_filter && !owns_therapist_filter {
            return Err(AppError::Auth("Not authorized to search these appointments".to_string()));
        }
    }

    let query = AppointmentSearchQuery {
        patient_id: params.patient_id,
        therapist_id: params.therapist_id,
        status: params.status,
        from_date: params.from_date,
        to_date: params.to_date,
        limit: params.limit,
        offset: params.offset,
    };

    let booking_service = BookingService::new(&state);

    let appointments = booking_service.search_appointments(query, token).await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "count": appointments.len()
    })))
}

// ==============================================================================
// RESCHEDULE / CANCEL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = BookingService::new(&state);

    let current = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = current.patient_id.to_string() == user.id;
    let is_therapist = current.therapist_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_therapist && !is_admin {
        return Err(AppError::Auth("Not authorized to reschedule this appointment".to_string()));
    }

    let appointment = booking_service
        .reschedule_appointment(appointment_id, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = BookingService::new(&state);

    let current = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_appointment_error)?;

    let is_patient = current.patient_id.to_string() == user.id;
    let is_therapist = current.therapist_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_therapist && !is_admin {
        return Err(AppError::Auth("Not authorized to cancel this appointment".to_string()));
    }

    let appointment = booking_service
        .cancel_appointment(appointment_id, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}
