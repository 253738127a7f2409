// libs/appointment-cell/src/handlers.rs
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

use crate::models::{AppointmentStatus, BookAppointmentRequest};
use crate::services::{AppointmentLifecycleService, BookingService};

// ==============================================================================
// PUBLIC BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let confirmation = service.book_appointment(request).await?;

    Ok(Json(json!({
        "appointment_id": confirmation.appointment.id,
        "donor_id": confirmation.donor_id,
        "status": confirmation.appointment.status,
        "new_donor": confirmation.new_donor,
        "rare_donor": confirmation.rare_donor,
        "message": "Appointment booked successfully"
    })))
}

// ==============================================================================
// HOSPITAL MANAGEMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&context)?;
    let service = BookingService::new(&state);

    let appointments = service.list_for_hospital(hospital_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

async fn update_status(
    state: &AppState,
    context: &AuthContext,
    appointment_id: DbId,
    new_status: AppointmentStatus,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentLifecycleService::new(state);

    let appointment = service
        .set_status(context, appointment_id, new_status, Utc::now().date_naive())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(appointment_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    update_status(&state, &context, appointment_id, AppointmentStatus::Approved).await
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(appointment_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    update_status(&state, &context, appointment_id, AppointmentStatus::Rejected).await
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthContext>,
    Path(appointment_id): Path<DbId>,
) -> Result<Json<Value>, AppError> {
    update_status(&state, &context, appointment_id, AppointmentStatus::Completed).await
}
