use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn dashboard_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route("/urgency-index", get(handlers::get_urgency_index))
        .route("/admin", get(handlers::get_admin_overview))
        .route("/admin/logs", get(handlers::get_activity_log))
        .route("/admin/hospitals", get(handlers::get_hospital_roster))
        .route("/admin/donors", get(handlers::get_donor_list))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
