// libs/therapist-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn therapist_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_therapists))
        .route("/{therapist_id}", get(handlers::get_therapist))
        .route("/{therapist_id}/unavailability", get(handlers::list_unavailability))
        .route("/{therapist_id}/unavailability", post(handlers::create_unavailability))
        .route("/{therapist_id}/unavailability/{window_id}", delete(handlers::delete_unavailability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
