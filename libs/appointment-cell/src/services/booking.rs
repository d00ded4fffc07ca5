// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;
use notification_cell::models::{CreateNotificationRequest, NotificationKind};
use notification_cell::services::NotificationService;
use payment_cell::models::{PaymentError, PaymentStatus};
use payment_cell::services::gateway::PaymentGatewayClient;
use therapist_cell::models::{CreateUnavailabilityRequest, Therapist};
use therapist_cell::services::unavailability::UnavailabilityService;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, BookingInitiation, BookingPolicy, CancelAppointmentRequest,
    ConfirmBookingRequest, RescheduleAppointmentRequest,
};
use crate::services::slots::{intervals_overlap, SlotService};

const UNAVAILABILITY_REASON_BOOKED: &str = "Booked session";

pub struct BookingService {
    baas: Arc<BaasClient>,
    slot_service: SlotService,
    unavailability_service: UnavailabilityService,
    notification_service: NotificationService,
    policy: BookingPolicy,
    config: AppConfig,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let baas = Arc::new(BaasClient::new(config));
        Self {
            slot_service: SlotService::new(config),
            unavailability_service: UnavailabilityService::with_client(Arc::clone(&baas)),
            notification_service: NotificationService::with_client(Arc::clone(&baas)),
            baas,
            policy: BookingPolicy::default(),
            config: config.clone(),
        }
    }

    /// Step one of booking: re-check the chosen slot against a fresh slot
    /// computation, then create a payment order for the checkout widget.
    /// Nothing is written to the calendar yet.
    pub async fn initiate_booking(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<BookingInitiation, AppointmentError> {
        info!("Initiating booking for patient {} with therapist {} at {}",
              request.patient_id, request.therapist_id, request.scheduled_at);

        self.validate_booking_time(request.scheduled_at, request.duration_minutes)?;
        self.verify_patient_exists(&request.patient_id, auth_token).await?;

        let therapist = self.slot_service
            .get_therapist(request.therapist_id, auth_token)
            .await?;
        if !therapist.is_accepting_patients {
            return Err(AppointmentError::TherapistNotAccepting);
        }

        self.ensure_slot_free(&request, &therapist, None, auth_token).await?;

        let gateway = self.payment_gateway()?;
        let receipt = format!("bk_{}", Uuid::new_v4().simple());
        let order = gateway
            .create_order(therapist.session_fee_cents, &therapist.currency, &receipt)
            .await
            .map_err(|e| AppointmentError::ExternalServiceError(e.to_string()))?;

        info!("Payment order {} created for patient {}", order.id, request.patient_id);

        Ok(BookingInitiation {
            order_id: order.id,
            amount_cents: therapist.session_fee_cents,
            currency: therapist.currency,
            therapist_id: request.therapist_id,
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
        })
    }

    /// Step two: the checkout widget reported success. Verify the payment
    /// signature, re-check the slot server-side, then write the
    /// appointment and its paired unavailability window. A failed window
    /// write rolls the appointment back.
    pub async fn confirm_booking(
        &self,
        request: ConfirmBookingRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Confirming booking for order {} (patient {})", request.order_id, request.patient_id);

        let gateway = self.payment_gateway()?;
        gateway
            .verify_checkout_signature(&request.order_id, &request.payment_id, &request.signature)
            .map_err(|e| match e {
                PaymentError::SignatureMismatch => AppointmentError::PaymentVerificationFailed,
                other => AppointmentError::ExternalServiceError(other.to_string()),
            })?;

        self.validate_booking_time(request.scheduled_at, request.duration_minutes)?;

        let therapist = self.slot_service
            .get_therapist(request.therapist_id, auth_token)
            .await?;

        // Payment has already been captured by the time this check runs.
        // Losing the race here means the order needs a manual refund; the
        // BaaS surface offers no transactional reservation to close the
        // gap entirely.
        let booking_request = BookAppointmentRequest {
            patient_id: request.patient_id,
            therapist_id: request.therapist_id,
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            session_type: request.session_type.clone(),
        };
        if let Err(e) = self.ensure_slot_free(&booking_request, &therapist, None, auth_token).await {
            warn!("Slot taken after payment for order {}; refund required", request.order_id);
            return Err(e);
        }

        let appointment = self
            .create_appointment_record(&request, therapist.session_fee_cents, &therapist.currency, auth_token)
            .await?;

        let window_request = CreateUnavailabilityRequest {
            starts_at: appointment.scheduled_at,
            ends_at: appointment.scheduled_end(),
            reason: UNAVAILABILITY_REASON_BOOKED.to_string(),
            appointment_id: Some(appointment.id),
        };

        if let Err(e) = self.unavailability_service
            .create_window(appointment.therapist_id, window_request, auth_token)
            .await
        {
            // Compensate: a booked appointment without its calendar block
            // would let a second patient claim the same time.
            error!("Unavailability write failed for appointment {}: {}; rolling back",
                   appointment.id, e);
            self.delete_appointment_record(appointment.id, auth_token).await?;
            return Err(AppointmentError::DatabaseError(
                "Booking could not be completed; no charge was kept".to_string()
            ));
        }

        info!("Appointment {} booked for patient {} with therapist {}",
              appointment.id, appointment.patient_id, appointment.therapist_id);

        self.notify(
            appointment.patient_id,
            NotificationKind::BookingConfirmed,
            "Session booked",
            format!("Your session on {} is confirmed", appointment.scheduled_at.format("%Y-%m-%d %H:%M")),
            appointment.id,
            auth_token,
        ).await;

        Ok(appointment)
    }

    /// Move an appointment to a new time. The slot calculator runs against
    /// the target date first, ignoring the appointment's own block.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.status != AppointmentStatus::Upcoming {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }
        self.validate_lockout(&current)?;

        let new_duration = request.new_duration_minutes.unwrap_or(current.duration_minutes);
        self.validate_booking_time(request.new_scheduled_at, new_duration)?;

        let therapist = self.slot_service
            .get_therapist(current.therapist_id, auth_token)
            .await?;

        let target = BookAppointmentRequest {
            patient_id: current.patient_id,
            therapist_id: current.therapist_id,
            scheduled_at: request.new_scheduled_at,
            duration_minutes: new_duration,
            session_type: request.new_session_type.clone().unwrap_or(current.session_type.clone()),
        };
        self.ensure_slot_free(&target, &therapist, Some(appointment_id), auth_token).await?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("scheduled_at".to_string(), json!(request.new_scheduled_at.to_rfc3339()));
        update_data.insert("duration_minutes".to_string(), json!(new_duration));
        if let Some(session_type) = &request.new_session_type {
            update_data.insert("session_type".to_string(), json!(session_type.to_string()));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch_appointment_record(appointment_id, Value::Object(update_data), auth_token).await?;

        // Supersede the paired calendar block.
        self.unavailability_service
            .delete_windows_for_appointment(appointment_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let window_request = CreateUnavailabilityRequest {
            starts_at: updated.scheduled_at,
            ends_at: updated.scheduled_end(),
            reason: UNAVAILABILITY_REASON_BOOKED.to_string(),
            appointment_id: Some(updated.id),
        };
        self.unavailability_service
            .create_window(updated.therapist_id, window_request, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        info!("Appointment {} rescheduled to {} ({:?})",
              appointment_id, updated.scheduled_at, request.reason);

        self.notify(
            updated.patient_id,
            NotificationKind::AppointmentRescheduled,
            "Session rescheduled",
            format!("Your session now starts at {}", updated.scheduled_at.format("%Y-%m-%d %H:%M")),
            updated.id,
            auth_token,
        ).await;

        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        match current.status {
            AppointmentStatus::Upcoming => {}
            other => return Err(AppointmentError::InvalidStatusTransition(other)),
        }
        self.validate_lockout(&current)?;

        let update_data = json!({
            "status": AppointmentStatus::Cancelled.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let cancelled = self.patch_appointment_record(appointment_id, update_data, auth_token).await?;

        // Free the therapist's calendar.
        self.unavailability_service
            .delete_windows_for_appointment(appointment_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        info!("Appointment {} cancelled by {:?}: {}",
              appointment_id, request.cancelled_by, request.reason);

        self.notify(
            cancelled.patient_id,
            NotificationKind::AppointmentCancelled,
            "Session cancelled",
            format!("Your session on {} was cancelled", cancelled.scheduled_at.format("%Y-%m-%d %H:%M")),
            cancelled.id,
            auth_token,
        ).await;

        Ok(cancelled)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(therapist_id) = query.therapist_id {
            query_parts.push(format!("therapist_id=eq.{}", therapist_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("scheduled_at=gte.{}", encoded));
        }
        if let Some(to_date) = query.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("scheduled_at=lte.{}", encoded));
        }

        let mut path = if query_parts.is_empty() {
            "/rest/v1/appointments?order=scheduled_at.desc".to_string()
        } else {
            format!("/rest/v1/appointments?{}&order=scheduled_at.desc", query_parts.join("&"))
        };

        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    fn payment_gateway(&self) -> Result<PaymentGatewayClient, AppointmentError> {
        PaymentGatewayClient::new(&self.config)
            .map_err(|e| AppointmentError::ExternalServiceError(e.to_string()))
    }

    /// Lifecycle notifications are best effort; a failed write never fails
    /// the booking operation itself.
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: String,
        appointment_id: Uuid,
        auth_token: &str,
    ) {
        let request = CreateNotificationRequest {
            user_id,
            kind,
            title: title.to_string(),
            body,
            appointment_id: Some(appointment_id),
        };

        if let Err(e) = self.notification_service.create_notification(request, auth_token).await {
            warn!("Failed to record notification for appointment {}: {}", appointment_id, e);
        }
    }

    /// Re-check the requested interval against fresh calendar state. This
    /// is an overlap test on the interval itself, not membership in a
    /// recomputed grid, so a slot browsed at any `step_minutes` stays
    /// bookable. Reschedule passes its own appointment id so the current
    /// booking does not block its own move.
    async fn ensure_slot_free(
        &self,
        request: &BookAppointmentRequest,
        therapist: &Therapist,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let date = request.scheduled_at.date_naive();
        let requested_end = request.scheduled_at
            + ChronoDuration::minutes(request.duration_minutes as i64);

        let day_start = date.and_time(therapist.work_day_starts).and_utc();
        let day_end = date.and_time(therapist.work_day_ends).and_utc();
        if request.scheduled_at < day_start || requested_end > day_end {
            return Err(AppointmentError::InvalidTime(
                "Requested time falls outside the therapist's working hours".to_string()
            ));
        }

        let mut appointments = self.slot_service
            .get_blocking_appointments(request.therapist_id, date, auth_token)
            .await?;
        let mut windows = self.unavailability_service
            .get_windows_for_date(request.therapist_id, date, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if let Some(exclude_id) = exclude_appointment_id {
            appointments.retain(|apt| apt.id != exclude_id);
            windows.retain(|w| w.appointment_id != Some(exclude_id));
        }

        let taken = appointments.iter().any(|apt| {
            apt.is_blocking()
                && intervals_overlap(request.scheduled_at, requested_end, apt.scheduled_at, apt.scheduled_end())
        }) || windows.iter().any(|w| {
            intervals_overlap(request.scheduled_at, requested_end, w.starts_at, w.ends_at)
        });

        if taken {
            warn!("Slot {} for therapist {} is no longer available",
                  request.scheduled_at, request.therapist_id);
            return Err(AppointmentError::SlotTaken);
        }

        Ok(())
    }

    fn validate_booking_time(
        &self,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<(), AppointmentError> {
        let now = Utc::now();

        let min_advance = ChronoDuration::hours(self.policy.min_advance_booking_hours as i64);
        if scheduled_at <= now + min_advance {
            return Err(AppointmentError::InvalidTime(
                format!("Sessions must be booked at least {} hour(s) in advance",
                        self.policy.min_advance_booking_hours)
            ));
        }

        let max_advance = ChronoDuration::days(self.policy.max_advance_booking_days as i64);
        if scheduled_at >= now + max_advance {
            return Err(AppointmentError::InvalidTime(
                format!("Sessions cannot be booked more than {} days in advance",
                        self.policy.max_advance_booking_days)
            ));
        }

        if duration_minutes < self.policy.min_session_minutes {
            return Err(AppointmentError::InvalidTime(
                format!("Session duration must be at least {} minutes",
                        self.policy.min_session_minutes)
            ));
        }

        if duration_minutes > self.policy.max_session_minutes {
            return Err(AppointmentError::InvalidTime(
                format!("Session duration cannot exceed {} minutes",
                        self.policy.max_session_minutes)
            ));
        }

        Ok(())
    }

    /// 24-hour lock-out: cancel and reschedule are refused close to the
    /// scheduled start. Enforced here, not only in the UI.
    fn validate_lockout(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let now = Utc::now();
        let lockout = ChronoDuration::hours(self.policy.lockout_hours as i64);

        if appointment.scheduled_at <= now + lockout {
            return Err(AppointmentError::InvalidTime(
                format!("Appointments can only be changed at least {} hours before the session",
                        self.policy.lockout_hours)
            ));
        }

        Ok(())
    }

    async fn verify_patient_exists(
        &self,
        patient_id: &Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/patient_profiles?id=eq.{}", patient_id);
        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::PatientNotFound);
        }

        Ok(())
    }

    async fn create_appointment_record(
        &self,
        request: &ConfirmBookingRequest,
        amount_cents: i64,
        currency: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();

        let appointment_data = json!({
            "patient_id": request.patient_id,
            "therapist_id": request.therapist_id,
            "scheduled_at": request.scheduled_at.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "session_type": request.session_type.to_string(),
            "status": AppointmentStatus::Upcoming.to_string(),
            "payment_status": PaymentStatus::Paid.to_string(),
            "amount_cents": amount_cents,
            "currency": currency,
            "provider_order_id": request.order_id,
            "provider_payment_id": request.payment_id,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError("Failed to create appointment".to_string()));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e)))?;

        Ok(appointment)
    }

    async fn patch_appointment_record(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError("Failed to update appointment".to_string()));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e)))?;

        Ok(appointment)
    }

    async fn delete_appointment_record(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.baas.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
