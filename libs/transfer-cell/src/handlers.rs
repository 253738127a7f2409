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
use shared_utils::extractor::require_hospital;

use crate::models::{CreateTransferRequest, TransferDecision};
use crate::services::{TransferLifecycleService, TransferService};

#[axum::debug_handler]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TransferService::new(&state);

    let created = service.request_transfer(&context, request).await?;

    Ok(Json(json!({
        "transfers": created,
        "created": created.len()
    })))
}

#[axum::debug_handler]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = TransferService::new(&state);

    let listing = service.list_transfers(hospital_id).await?;

    Ok(Json(json!(listing)))
}

async fn resolve(
    state: &AppState,
    context: &AuthContext,
    request_id: DbId,
    decision: TransferDecision,
) -> Result<Json<Value>, AppError> {
    let service = TransferLifecycleService::new(state);

    let resolution = service
        .resolve_transfer(context, request_id, decision, Utc::now().date_naive())
        .await?;

    Ok(Json(json!(resolution)))
}

#[axum::debug_handler]
pub async fn approve_transfer(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(request_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    resolve(&state, &context, request_id, TransferDecision::Approve).await
}

#[axum::debug_handler]
pub async fn reject_transfer(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(request_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    resolve(&state, &context, request_id, TransferDecision::Reject).await
}

#[axum::debug_handler]
pub async fn fulfil_transfer(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(request_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    resolve(&state, &context, request_id, TransferDecision::Fulfil).await
}
