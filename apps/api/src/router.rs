use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use notification_cell::router::notification_routes;
use patient_cell::router::patient_routes;
use payment_cell::router::payment_routes;
use therapist_cell::router::therapist_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Calmwell API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/notifications", notification_routes(state))
}
