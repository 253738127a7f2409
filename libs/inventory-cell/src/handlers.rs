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

use crate::models::AddStockRequest;
use crate::services::InventoryService;

#[axum::debug_handler]
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = InventoryService::new(&state);

    let entries = service.list_stock(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!({
        "inventory": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn add_stock(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Json(request): Json<AddStockRequest>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&state);

    let unit = service.add_or_increment_stock(&context, request).await?;

    Ok(Json(json!(unit)))
}

#[axum::debug_handler]
pub async fn inventory_summary(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = InventoryService::new(&state);

    let summary = service.stock_summary(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!({ "summary": summary })))
}

#[axum::debug_handler]
pub async fn blood_availability(
    State(state): State<Arc<AppState>>,
    Path(hospital_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&state);

    let availability = service.availability(hospital_id, Utc::now().date_naive()).await?;

    Ok(Json(json!({
        "hospital_id": hospital_id,
        "availability": availability
    })))
}
