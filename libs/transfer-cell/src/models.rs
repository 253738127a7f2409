use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use inventory_cell::models::{Draw, InventoryError};
use shared_models::error::AppError;
use shared_models::{BloodType, DbId, Urgency};

// ==============================================================================
// CORE TRANSFER MODELS
// ==============================================================================

/// A request from `from_hospital_id` asking `to_hospital_id` to supply units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TransferRequest {
    pub id: DbId,
    pub from_hospital_id: DbId,
    pub to_hospital_id: DbId,
    pub blood_type: BloodType,
    pub units_needed: i64,
    pub urgency: Urgency,
    pub status: TransferStatus,
    pub notes: Option<String>,
    /// Shared by every row of one broadcast; None for a direct request.
    pub broadcast_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum TransferStatus {
    Pending,
    Approved,
    #[serde(alias = "Denied")]
    Rejected,
    Completed,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "Pending"),
            TransferStatus::Approved => write!(f, "Approved"),
            TransferStatus::Rejected => write!(f, "Rejected"),
            TransferStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// Transfer joined with the hospital on the other side of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TransferView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub transfer: TransferRequest,
    pub counterparty_name: String,
    pub counterparty_city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferListing {
    pub incoming: Vec<TransferView>,
    pub outgoing: Vec<TransferView>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferTarget {
    /// Every hospital except the sender.
    Broadcast,
    Direct(DbId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub blood_type: BloodType,
    pub units_needed: i64,
    /// Omitted for a broadcast to the whole network.
    pub to_hospital_id: Option<DbId>,
    #[serde(default)]
    pub urgency: Urgency,
    pub notes: Option<String>,
}

impl CreateTransferRequest {
    pub fn target(&self) -> TransferTarget {
        match self.to_hospital_id {
            Some(hospital_id) => TransferTarget::Direct(hospital_id),
            None => TransferTarget::Broadcast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDecision {
    Approve,
    Reject,
    Fulfil,
}

impl TransferDecision {
    pub fn target_status(&self) -> TransferStatus {
        match self {
            TransferDecision::Approve => TransferStatus::Approved,
            TransferDecision::Reject => TransferStatus::Rejected,
            TransferDecision::Fulfil => TransferStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResolution {
    pub transfer: TransferRequest,
    /// Rows drawn from the supplier; empty unless the transfer was fulfilled.
    pub moved: Vec<Draw>,
    /// Other open rows of the same broadcast, closed by this fulfilment.
    pub superseded: Vec<DbId>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer request not found")]
    NotFound,

    #[error("Hospital not found")]
    HospitalNotFound,

    #[error("No other hospitals to broadcast to")]
    NoRecipients,

    #[error("Only the receiving hospital can act on this transfer")]
    Unauthorized,

    #[error("Transfer cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: TransferStatus,
        to: TransferStatus,
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

impl From<sqlx::Error> for TransferError {
    fn from(err: sqlx::Error) -> Self {
        TransferError::DatabaseError(err.to_string())
    }
}

impl From<InventoryError> for TransferError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock { blood_type, requested, available } => {
                TransferError::InsufficientStock { blood_type, requested, available }
            }
            InventoryError::HospitalNotFound => TransferError::HospitalNotFound,
            InventoryError::Unauthorized => TransferError::Unauthorized,
            InventoryError::ValidationError(msg) => TransferError::ValidationError(msg),
            InventoryError::DatabaseError(msg) => TransferError::DatabaseError(msg),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::NotFound | TransferError::HospitalNotFound => AppError::NotFound(err.to_string()),
            TransferError::NoRecipients => AppError::BadRequest(err.to_string()),
            TransferError::Unauthorized => AppError::Forbidden(err.to_string()),
            TransferError::InvalidStatusTransition { .. } => AppError::InvalidTransition(err.to_string()),
            TransferError::ValidationError(msg) => AppError::ValidationError(msg),
            TransferError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            TransferError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
