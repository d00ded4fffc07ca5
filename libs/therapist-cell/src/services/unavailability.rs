use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;

use crate::models::{CreateUnavailabilityRequest, TherapistError, UnavailabilityWindow};

pub struct UnavailabilityService {
    baas: Arc<BaasClient>,
}

impl UnavailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            baas: Arc::new(BaasClient::new(config)),
        }
    }

    pub fn with_client(baas: Arc<BaasClient>) -> Self {
        Self { baas }
    }

    /// Windows intersecting the given day, ordered by start.
    pub async fn get_windows_for_date(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<UnavailabilityWindow>, TherapistError> {
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = date.and_hms_opt(23, 59, 59).unwrap().and_utc();

        self.get_windows_in_range(therapist_id, start_of_day, end_of_day, auth_token).await
    }

    pub async fn get_windows_in_range(
        &self,
        therapist_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<UnavailabilityWindow>, TherapistError> {
        debug!("Fetching unavailability for therapist {} from {} to {}",
               therapist_id, starts_at, ends_at);

        let path = format!(
            "/rest/v1/unavailability_windows?therapist_id=eq.{}&starts_at=lte.{}&ends_at=gte.{}&order=starts_at.asc",
            therapist_id,
            urlencoding::encode(&ends_at.to_rfc3339()),
            urlencoding::encode(&starts_at.to_rfc3339()),
        );

        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let windows: Vec<UnavailabilityWindow> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<UnavailabilityWindow>, _>>()
            .map_err(|e| TherapistError::DatabaseError(format!("Failed to parse windows: {}", e)))?;

        Ok(windows)
    }

    pub async fn create_window(
        &self,
        therapist_id: Uuid,
        request: CreateUnavailabilityRequest,
        auth_token: &str,
    ) -> Result<UnavailabilityWindow, TherapistError> {
        debug!("Creating unavailability window for therapist {} from {} to {}",
               therapist_id, request.starts_at, request.ends_at);

        if request.starts_at >= request.ends_at {
            return Err(TherapistError::InvalidWindow(
                "Window start must be before its end".to_string()
            ));
        }

        let window_data = json!({
            "therapist_id": therapist_id,
            "starts_at": request.starts_at.to_rfc3339(),
            "ends_at": request.ends_at.to_rfc3339(),
            "reason": request.reason,
            "appointment_id": request.appointment_id,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::POST,
            "/rest/v1/unavailability_windows",
            Some(auth_token),
            Some(window_data),
            Some(headers),
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TherapistError::DatabaseError("Failed to create unavailability window".to_string()));
        }

        let window: UnavailabilityWindow = serde_json::from_value(result[0].clone())
            .map_err(|e| TherapistError::DatabaseError(format!("Failed to parse created window: {}", e)))?;

        Ok(window)
    }

    pub async fn delete_window(
        &self,
        window_id: Uuid,
        auth_token: &str,
    ) -> Result<(), TherapistError> {
        debug!("Deleting unavailability window: {}", window_id);

        let path = format!("/rest/v1/unavailability_windows?id=eq.{}", window_id);
        // return=representation keeps the response parseable JSON
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.baas.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Remove the window paired with an appointment (reschedule supersedes
    /// it, cancel voids it).
    pub async fn delete_windows_for_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), TherapistError> {
        debug!("Deleting unavailability windows for appointment: {}", appointment_id);

        let path = format!("/rest/v1/unavailability_windows?appointment_id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.baas.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
