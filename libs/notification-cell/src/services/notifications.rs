// libs/notification-cell/src/services/notifications.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::baas::BaasClient;

use crate::models::{CreateNotificationRequest, Notification, NotificationError};

pub struct NotificationService {
    baas: Arc<BaasClient>,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            baas: Arc::new(BaasClient::new(config)),
        }
    }

    pub fn with_client(baas: Arc<BaasClient>) -> Self {
        Self { baas }
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        debug!("Listing notifications for user {} (unread_only={})", user_id, unread_only);

        let mut path = format!(
            "/rest/v1/notifications?user_id=eq.{}&order=created_at.desc",
            user_id
        );
        if unread_only {
            path.push_str("&is_read=eq.false");
        }
        path.push_str(&format!("&limit={}", limit.unwrap_or(50)));

        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let notifications: Vec<Notification> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Notification>, _>>()
            .map_err(|e| NotificationError::DatabaseError(format!("Failed to parse notifications: {}", e)))?;

        Ok(notifications)
    }

    pub async fn unread_count(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<usize, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&is_read=eq.false&select=id",
            user_id
        );

        let result: Vec<Value> = self.baas.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(result.len())
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        debug!("Marking notification {} read", notification_id);

        // The user filter keeps one user from flipping another's flags.
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&user_id=eq.{}",
            notification_id, user_id
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "is_read": true })),
            Some(headers),
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(NotificationError::NotFound);
        }

        let notification: Notification = serde_json::from_value(result[0].clone())
            .map_err(|e| NotificationError::DatabaseError(format!("Failed to parse notification: {}", e)))?;

        Ok(notification)
    }

    pub async fn mark_all_read(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        debug!("Marking all notifications read for user {}", user_id);

        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&is_read=eq.false",
            user_id
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self.baas.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "is_read": true })),
            Some(headers),
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Used by the booking flow to leave a trace of lifecycle events.
    pub async fn create_notification(
        &self,
        request: CreateNotificationRequest,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let notification_data = json!({
            "user_id": request.user_id,
            "kind": request.kind.to_string(),
            "title": request.title,
            "body": request.body,
            "appointment_id": request.appointment_id,
            "is_read": false,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.baas.request_with_headers(
            Method::POST,
            "/rest/v1/notifications",
            Some(auth_token),
            Some(notification_data),
            Some(headers),
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(NotificationError::DatabaseError("Failed to create notification".to_string()));
        }

        let notification: Notification = serde_json::from_value(result[0].clone())
            .map_err(|e| NotificationError::DatabaseError(format!("Failed to parse notification: {}", e)))?;

        Ok(notification)
    }
}
