// libs/therapist-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveTime};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialization: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Per-session fee in minor currency units.
    pub session_fee_cents: i64,
    pub currency: String,
    /// Bookable-day bounds. Slots are generated inside this window only.
    pub work_day_starts: NaiveTime,
    pub work_day_ends: NaiveTime,
    pub is_accepting_patients: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A therapist-scoped interval during which no new appointment may be
/// booked. One is created alongside every committed appointment; manual
/// windows (holidays, admin blocks) carry no appointment backlink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailabilityWindow {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: String,
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUnavailabilityRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: String,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistSearchFilters {
    pub specialization: Option<String>,
    pub accepting_only: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum TherapistError {
    #[error("Therapist not found")]
    NotFound,

    #[error("Therapist is not accepting new patients")]
    NotAccepting,

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Unavailability window conflicts with an existing window")]
    WindowConflict,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
