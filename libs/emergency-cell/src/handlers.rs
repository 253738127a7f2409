use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthContext;
use shared_models::error::AppError;
use shared_models::DbId;
use shared_utils::extractor::{require_admin, require_hospital};

use crate::models::SubmitEmergencyRequest;
use crate::services::EmergencyService;

#[axum::debug_handler]
pub async fn submit_emergency(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Json(request): Json<SubmitEmergencyRequest>,
) -> Result<Json<Value>, AppError> {
    let service = EmergencyService::new(&state);

    let created = service.submit(&context, request).await?;

    Ok(Json(json!(created)))
}

#[axum::debug_handler]
pub async fn list_own_emergencies(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = EmergencyService::new(&state);

    let requests = service.list_for_hospital(hospital_id).await?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn list_all_emergencies(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    require_admin(&context)?;
    let service = EmergencyService::new(&state);

    let requests = service.list().await?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn approve_emergency(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(request_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    let service = EmergencyService::new(&state);

    let approval = service
        .approve(&context, request_id, Utc::now().date_naive())
        .await?;

    Ok(Json(json!(approval)))
}

#[axum::debug_handler]
pub async fn reject_emergency(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(request_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    let service = EmergencyService::new(&state);

    let rejected = service.reject(&context, request_id).await?;

    Ok(Json(json!(rejected)))
}
