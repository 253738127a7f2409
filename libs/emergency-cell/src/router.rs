use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn emergency_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_own_emergencies).post(handlers::submit_emergency))
        // Admin only
        .route("/all", get(handlers::list_all_emergencies))
        .route("/{request_id}/approve", post(handlers::approve_emergency))
        .route("/{request_id}/reject", post(handlers::reject_emergency))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
