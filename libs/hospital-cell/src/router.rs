use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/hospitals/register", post(handlers::register_hospital))
        .route("/hospitals/login", post(handlers::login_hospital))
        .route("/admin/login", post(handlers::login_admin))
        .route("/verify", get(handlers::verify_token))
        .with_state(state)
}

pub fn hospital_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/cities", get(handlers::list_cities))
        .route("/by-city/{city}", get(handlers::hospitals_by_city));

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_own_profile))
        .route("/network", get(handlers::network_view))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
