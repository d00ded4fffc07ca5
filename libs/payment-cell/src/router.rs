// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{Router, routing::post};

use shared_config::AppConfig;

use crate::handlers;

/// Webhook route sits outside the JWT middleware; the handler verifies
/// the gateway signature itself.
pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/webhook", post(handlers::payment_webhook))
        .with_state(state)
}
