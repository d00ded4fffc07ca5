use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;

use crate::models::{Therapist, TherapistError, TherapistSearchFilters};

pub struct TherapistService {
    baas: Arc<BaasClient>,
}

impl TherapistService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            baas: Arc::new(BaasClient::new(config)),
        }
    }

    pub fn with_client(baas: Arc<BaasClient>) -> Self {
        Self { baas }
    }

    pub async fn get_therapist(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        debug!("Fetching therapist: {}", therapist_id);

        let path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);
        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(TherapistError::NotFound);
        }

        let therapist: Therapist = serde_json::from_value(result[0].clone())
            .map_err(|e| TherapistError::DatabaseError(format!("Failed to parse therapist: {}", e)))?;

        Ok(therapist)
    }

    pub async fn list_therapists(
        &self,
        filters: TherapistSearchFilters,
        auth_token: &str,
    ) -> Result<Vec<Therapist>, TherapistError> {
        debug!("Listing therapists with filters: {:?}", filters);

        let mut query_parts = Vec::new();

        if let Some(specialization) = filters.specialization {
            query_parts.push(format!("specialization=ilike.*{}*", urlencoding::encode(&specialization)));
        }
        if filters.accepting_only.unwrap_or(true) {
            query_parts.push("is_accepting_patients=eq.true".to_string());
        }

        let mut path = if query_parts.is_empty() {
            "/rest/v1/therapists?order=full_name.asc".to_string()
        } else {
            format!("/rest/v1/therapists?{}&order=full_name.asc", query_parts.join("&"))
        };

        if let Some(limit) = filters.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = filters.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let therapists: Vec<Therapist> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Therapist>, _>>()
            .map_err(|e| TherapistError::DatabaseError(format!("Failed to parse therapists: {}", e)))?;

        Ok(therapists)
    }
}
