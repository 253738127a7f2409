use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use appointment_cell::router::appointment_routes;
use dashboard_cell::router::dashboard_routes;
use emergency_cell::router::emergency_routes;
use hospital_cell::router::{auth_routes, hospital_routes};
use inventory_cell::router::inventory_routes;
use shared_database::{ping, AppState};
use transfer_cell::router::transfer_routes;

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "up" })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "down" })),
            )
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Blood Network API is running!" }))
        .route("/health", get(health).with_state(state.clone()))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/hospitals", hospital_routes(state.clone()))
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/transfers", transfer_routes(state.clone()))
        .nest("/emergency", emergency_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state))
}
