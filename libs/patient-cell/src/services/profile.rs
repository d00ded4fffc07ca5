// libs/patient-cell/src/services/profile.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;

use crate::models::{PatientProfile, PatientError, UpdateProfileRequest};

pub struct ProfileService {
    baas: Arc<BaasClient>,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            baas: Arc::new(BaasClient::new(config)),
        }
    }

    pub fn with_client(baas: Arc<BaasClient>) -> Self {
        Self { baas }
    }

    /// Profile rows share their id with the auth user, so `user_id` is the
    /// primary key here.
    pub async fn get_profile(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<PatientProfile, PatientError> {
        debug!("Fetching patient profile: {}", user_id);

        let path = format!("/rest/v1/patient_profiles?id=eq.{}", user_id);
        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        let profile: PatientProfile = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse profile: {}", e)))?;

        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<PatientProfile, PatientError> {
        debug!("Updating patient profile: {}", user_id);

        let mut update_data = serde_json::Map::new();

        if let Some(full_name) = request.full_name {
            if full_name.trim().is_empty() {
                return Err(PatientError::ValidationError("Name cannot be empty".to_string()));
            }
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert(
                "date_of_birth".to_string(),
                json!(date_of_birth.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(timezone) = request.timezone {
            update_data.insert("timezone".to_string(), json!(timezone));
        }
        if let Some(name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(name));
        }
        if let Some(phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(phone));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patient_profiles?id=eq.{}", user_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        let profile: PatientProfile = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse profile: {}", e)))?;

        Ok(profile)
    }
}
