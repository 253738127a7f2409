use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use inventory_cell::models::{Draw, InventoryError};
use shared_models::error::AppError;
use shared_models::{BloodType, DbId, Urgency};

// ==============================================================================
// CORE EMERGENCY MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EmergencyRequest {
    pub id: DbId,
    pub hospital_id: DbId,
    pub requester_name: String,
    pub blood_type: BloodType,
    pub units_required: i64,
    pub units_fulfilled: i64,
    pub urgency: Urgency,
    pub status: EmergencyStatus,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum EmergencyStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyStatus::Pending => write!(f, "Pending"),
            EmergencyStatus::Approved => write!(f, "Approved"),
            EmergencyStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EmergencyView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub request: EmergencyRequest,
    pub hospital_name: String,
    pub hospital_city: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEmergencyRequest {
    pub requester_name: String,
    pub blood_type: BloodType,
    pub units_required: i64,
    pub urgency: Urgency,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyApproval {
    pub request: EmergencyRequest,
    pub draws: Vec<Draw>,
    /// Units that could not be covered; always zero under the strict policy.
    pub shortfall: i64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum EmergencyError {
    #[error("Emergency request not found")]
    NotFound,

    #[error("Only hospital accounts can raise emergency requests")]
    HospitalOnly,

    #[error("Only administrators can resolve emergency requests")]
    AdminOnly,

    #[error("Emergency request cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: EmergencyStatus,
        to: EmergencyStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient {blood_type} stock: requested {requested}, available {available}")]
    InsufficientStock {
        blood_type: BloodType,
        requested: i64,
        available: i64,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for EmergencyError {
    fn from(err: sqlx::Error) -> Self {
        EmergencyError::DatabaseError(err.to_string())
    }
}

impl From<InventoryError> for EmergencyError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock { blood_type, requested, available } => {
                EmergencyError::InsufficientStock { blood_type, requested, available }
            }
            InventoryError::ValidationError(msg) => EmergencyError::ValidationError(msg),
            other => EmergencyError::DatabaseError(other.to_string()),
        }
    }
}

impl From<EmergencyError> for AppError {
    fn from(err: EmergencyError) -> Self {
        match err {
            EmergencyError::NotFound => AppError::NotFound(err.to_string()),
            EmergencyError::HospitalOnly | EmergencyError::AdminOnly => AppError::Forbidden(err.to_string()),
            EmergencyError::InvalidStatusTransition { .. } => AppError::InvalidTransition(err.to_string()),
            EmergencyError::ValidationError(msg) => AppError::ValidationError(msg),
            EmergencyError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            EmergencyError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
