// libs/payment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::services::gateway::PaymentGatewayClient;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Gateway webhook receiver. Authenticated by signature over the raw
/// payload rather than a user JWT; the body must not be re-serialized
/// before verification.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing webhook signature".to_string()))?;

    let gateway = PaymentGatewayClient::new(&state)
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    gateway
        .verify_webhook_signature(&body, signature)
        .map_err(|_| AppError::Auth("Invalid webhook signature".to_string()))?;

    let payload: Value = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    // Payment state is settled on the confirm path; webhook events are
    // recorded for reconciliation only.
    match payload["event"].as_str() {
        Some(event) => info!("Payment webhook received: {}", event),
        None => warn!("Payment webhook without an event field"),
    }

    Ok(Json(json!({ "received": true })))
}
