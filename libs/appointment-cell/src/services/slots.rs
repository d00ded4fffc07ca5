// libs/appointment-cell/src/services/slots.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;
use therapist_cell::models::{Therapist, UnavailabilityWindow};
use therapist_cell::services::therapist::TherapistService;
use therapist_cell::services::unavailability::UnavailabilityService;

use crate::models::{
    Appointment, AppointmentError, BlockedSlot, DaySlots, SlotBlockReason, SlotQuery, TimeSlot,
    BookingPolicy,
};

/// Computes the free/blocked slot sets for a therapist's day. This is a
/// read at request time; the booking path re-checks before committing.
pub struct SlotService {
    baas: Arc<BaasClient>,
    therapist_service: TherapistService,
    unavailability_service: UnavailabilityService,
    policy: BookingPolicy,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        let baas = Arc::new(BaasClient::new(config));
        Self {
            therapist_service: TherapistService::with_client(Arc::clone(&baas)),
            unavailability_service: UnavailabilityService::with_client(Arc::clone(&baas)),
            baas,
            policy: BookingPolicy::default(),
        }
    }

    pub async fn day_slots(
        &self,
        query: &SlotQuery,
        auth_token: &str,
    ) -> Result<DaySlots, AppointmentError> {
        debug!("Computing slots for therapist {} on {}", query.therapist_id, query.date);

        let therapist = self.therapist_service
            .get_therapist(query.therapist_id, auth_token)
            .await
            .map_err(|e| match e {
                therapist_cell::models::TherapistError::NotFound => AppointmentError::TherapistNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let step = Duration::minutes(
            query.step_minutes.unwrap_or(self.policy.default_step_minutes) as i64
        );
        let duration = Duration::minutes(
            query.duration_minutes.unwrap_or(self.policy.default_session_minutes) as i64
        );

        if step <= Duration::zero() || duration <= Duration::zero() {
            return Err(AppointmentError::ValidationError(
                "Step and duration must be positive".to_string()
            ));
        }

        let day_start = query.date.and_time(therapist.work_day_starts).and_utc();
        let day_end = query.date.and_time(therapist.work_day_ends).and_utc();

        let appointments = self
            .get_blocking_appointments(query.therapist_id, query.date, auth_token)
            .await?;
        let windows = self.unavailability_service
            .get_windows_for_date(query.therapist_id, query.date, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let slots = compute_day_slots(day_start, day_end, step, duration, &appointments, &windows);

        debug!("Therapist {} on {}: {} free, {} blocked",
               query.therapist_id, query.date, slots.available.len(), slots.unavailable.len());

        Ok(slots)
    }

    /// Fetch the therapist record the slot window derives from; booking
    /// reuses this for pricing.
    pub async fn get_therapist(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Therapist, AppointmentError> {
        self.therapist_service
            .get_therapist(therapist_id, auth_token)
            .await
            .map_err(|e| match e {
                therapist_cell::models::TherapistError::NotFound => AppointmentError::TherapistNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })
    }

    pub(crate) async fn get_blocking_appointments(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        // A session can start before midnight and spill into the queried
        // day, so the fetch window starts max_session_minutes earlier.
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc()
            - Duration::minutes(self.policy.max_session_minutes as i64);
        let end_of_day = date.and_hms_opt(23, 59, 59).unwrap().and_utc();

        let path = format!(
            "/rest/v1/appointments?therapist_id=eq.{}&scheduled_at=gte.{}&scheduled_at=lte.{}&status=in.(upcoming,completed)&order=scheduled_at.asc",
            therapist_id,
            urlencoding::encode(&start_of_day.to_rfc3339()),
            urlencoding::encode(&end_of_day.to_rfc3339()),
        );

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
}

/// The slot calculation itself: walk the bookable day in `step` increments
/// and classify each candidate `[start, start + duration)` interval.
/// Slots that would run past `day_end` are excluded, not truncated.
pub fn compute_day_slots(
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    step: Duration,
    duration: Duration,
    appointments: &[Appointment],
    windows: &[UnavailabilityWindow],
) -> DaySlots {
    let mut available = Vec::new();
    let mut unavailable = Vec::new();

    let mut start = day_start;
    while start + duration <= day_end {
        let end = start + duration;
        let slot = TimeSlot { start_time: start, end_time: end };

        if let Some(reason) = classify_block(&slot, appointments, windows) {
            unavailable.push(BlockedSlot { slot, reason });
        } else {
            available.push(slot);
        }

        start += step;
    }

    dedup_slot_sets(available, unavailable)
}

fn classify_block(
    slot: &TimeSlot,
    appointments: &[Appointment],
    windows: &[UnavailabilityWindow],
) -> Option<SlotBlockReason> {
    let booked = appointments.iter().any(|apt| {
        apt.is_blocking()
            && intervals_overlap(slot.start_time, slot.end_time, apt.scheduled_at, apt.scheduled_end())
    });
    if booked {
        return Some(SlotBlockReason::Booked);
    }

    windows.iter()
        .find(|w| intervals_overlap(slot.start_time, slot.end_time, w.starts_at, w.ends_at))
        .map(|w| SlotBlockReason::TherapistUnavailable { reason: w.reason.clone() })
}

pub(crate) fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Defensive pass enforcing `available ∩ unavailable = ∅` over start
/// times. The walk above should already guarantee it; the sets are not
/// trusted to stay disjoint as the classification grows richer.
fn dedup_slot_sets(mut available: Vec<TimeSlot>, unavailable: Vec<BlockedSlot>) -> DaySlots {
    let blocked_starts: HashSet<DateTime<Utc>> = unavailable
        .iter()
        .map(|b| b.slot.start_time)
        .collect();

    available.retain(|slot| !blocked_starts.contains(&slot.start_time));
    available.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    available.dedup_by_key(|slot| slot.start_time);

    DaySlots { available, unavailable }
}
