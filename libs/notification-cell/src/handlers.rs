// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::NotificationError;
use crate::services::NotificationService;

#[derive(Debug, Deserialize)]
pub struct NotificationQueryParams {
    pub unread_only: Option<bool>,
    pub limit: Option<i32>,
}

fn map_notification_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
        NotificationError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(params): Query<NotificationQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notifications = service
        .list_for_user(
            &user.id,
            params.unread_only.unwrap_or(false),
            params.limit,
            auth.token(),
        )
        .await
        .map_err(map_notification_error)?;

    Ok(Json(json!({
        "success": true,
        "notifications": notifications,
        "count": notifications.len()
    })))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let count = service.unread_count(&user.id, auth.token()).await
        .map_err(map_notification_error)?;

    Ok(Json(json!({
        "success": true,
        "unread": count
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppConfig>>,
    Path(notification_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notification = service.mark_read(notification_id, &user.id, auth.token()).await
        .map_err(map_notification_error)?;

    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    service.mark_all_read(&user.id, auth.token()).await
        .map_err(map_notification_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "All notifications marked read"
    })))
}
