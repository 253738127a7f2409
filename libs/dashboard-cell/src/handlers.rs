use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthContext;
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = DashboardService::new(&state);

    let dashboard = service.dashboard(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn get_urgency_index(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = DashboardService::new(&state);

    let index = service.urgency_index(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!({ "urgency_index": index })))
}

#[axum::debug_handler]
pub async fn get_admin_overview(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let service = DashboardService::new(&state);

    let overview = service.admin_overview(&context).await?;

    Ok(Json(json!(overview)))
}

#[axum::debug_handler]
pub async fn get_activity_log(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let service = DashboardService::new(&state);

    let logs = service.activity_log(&context).await?;

    Ok(Json(json!({ "logs": logs })))
}

#[axum::debug_handler]
pub async fn get_hospital_roster(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let service = DashboardService::new(&state);

    let hospitals = service.hospital_roster(&context, Utc::now().date_naive()).await?;

    Ok(Json(json!({ "hospitals": hospitals })))
}

#[axum::debug_handler]
pub async fn get_donor_list(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let service = DashboardService::new(&state);

    let donors = service.donor_list(&context).await?;

    Ok(Json(json!({ "donors": donors })))
}
