use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn inventory_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/availability/{hospital_id}", get(blood_availability));

    let protected_routes = Router::new()
        .route("/", get(list_inventory).post(add_stock))
        .route("/summary", get(inventory_summary))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public_routes.merge(protected_routes).with_state(state)
}
