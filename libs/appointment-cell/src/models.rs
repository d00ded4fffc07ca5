// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

use payment_cell::models::PaymentStatus;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub session_type: SessionType,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    /// Fee captured at booking time, in minor currency units.
    pub amount_cents: i64,
    pub currency: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_at + chrono::Duration::minutes(self.duration_minutes as i64)
    }

    /// Whether this appointment blocks the therapist's calendar. Cancelled,
    /// rejected and expired bookings free their slot.
    pub fn is_blocking(&self) -> bool {
        matches!(self.status, AppointmentStatus::Upcoming | AppointmentStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
    Rejected,
    Expired,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Video,
    Phone,
    InPerson,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Video => write!(f, "video"),
            SessionType::Phone => write!(f, "phone"),
            SessionType::InPerson => write!(f, "in_person"),
        }
    }
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// A fixed-length interval on a given day, identified by its start time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotBlockReason {
    /// Overlaps an existing non-cancelled appointment.
    Booked,
    /// Overlaps an explicit therapist unavailability window.
    TherapistUnavailable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedSlot {
    pub slot: TimeSlot,
    pub reason: SlotBlockReason,
}

/// Output of the slot calculator. `available` and `unavailable` are
/// disjoint over start times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub available: Vec<TimeSlot>,
    pub unavailable: Vec<BlockedSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub step_minutes: Option<i32>,
    pub duration_minutes: Option<i32>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub session_type: SessionType,
}

/// Handed back after the slot re-check so the client can open the
/// checkout widget against the created order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingInitiation {
    pub order_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub therapist_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmBookingRequest {
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub session_type: SessionType,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_scheduled_at: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
    pub new_session_type: Option<SessionType>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Therapist,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub therapist_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("The selected slot is no longer available")]
    SlotTaken,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Therapist is not accepting new patients")]
    TherapistNotAccepting,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

// ==============================================================================
// BOOKING POLICY
// ==============================================================================

#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub min_advance_booking_hours: i32,
    pub max_advance_booking_days: i32,
    /// Cancel and reschedule are refused inside this window of the start.
    pub lockout_hours: i32,
    pub min_session_minutes: i32,
    pub max_session_minutes: i32,
    pub default_step_minutes: i32,
    pub default_session_minutes: i32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_advance_booking_hours: 1,
            max_advance_booking_days: 60,
            lockout_hours: 24,
            min_session_minutes: 15,
            max_session_minutes: 120,
            default_step_minutes: 30,
            default_session_minutes: 60,
        }
    }
}
