use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::{AuthContext, TokenResponse};
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::models::{AdminLoginRequest, LoginRequest, RegisterHospitalRequest};
use crate::services::{AuthService, HospitalService};

// ==============================================================================
// AUTHENTICATION
// ==============================================================================

#[axum::debug_handler]
pub async fn register_hospital(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterHospitalRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let hospital = service.register(request).await?;

    Ok(Json(json!({
        "hospital": hospital,
        "message": "Hospital registered successfully"
    })))
}

#[axum::debug_handler]
pub async fn login_hospital(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let service = AuthService::new(&state);

    let token = service.login(request).await?;

    Ok(Json(token))
}

#[axum::debug_handler]
pub async fn login_admin(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let service = AuthService::new(&state);

    let token = service.admin_login(request).await?;

    Ok(Json(token))
}

pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");
    let service = AuthService::new(&state);

    match service.verify(auth.token()) {
        Ok(context) => Ok(Json(json!({
            "valid": true,
            "subject_id": context.subject_id,
            "role": context.role,
            "name": context.name
        }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

// ==============================================================================
// DIRECTORY
// ==============================================================================

#[axum::debug_handler]
pub async fn list_cities(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let cities = service.cities().await?;

    Ok(Json(json!({ "cities": cities })))
}

#[axum::debug_handler]
pub async fn hospitals_by_city(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let hospitals = service.hospitals_in_city(&city).await?;

    Ok(Json(json!({
        "city": city,
        "hospitals": hospitals
    })))
}

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = HospitalService::new(&state);

    let hospital = service.get(hospital_id).await?;

    Ok(Json(json!(hospital)))
}

#[axum::debug_handler]
pub async fn network_view(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = HospitalService::new(&state);

    let network = service.network(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!({
        "hospitals": network,
        "total": network.len()
    })))
}
