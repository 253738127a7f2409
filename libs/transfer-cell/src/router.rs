use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn transfer_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_transfers).post(handlers::create_transfer))
        .route("/{request_id}/approve", post(handlers::approve_transfer))
        .route("/{request_id}/reject", post(handlers::reject_transfer))
        .route("/{request_id}/fulfil", post(handlers::fulfil_transfer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
