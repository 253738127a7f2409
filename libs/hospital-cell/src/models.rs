use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shared_models::error::AppError;
use shared_models::{BloodType, DbId};

// ==============================================================================
// HOSPITAL MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Hospital {
    pub id: DbId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub reliability_score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HospitalListing {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStock {
    pub blood_type: BloodType,
    pub units: i64,
}

/// Another hospital in the network as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHospital {
    pub id: DbId,
    pub name: String,
    pub city: String,
    pub phone: Option<String>,
    pub reliability_score: i64,
    pub stock: Vec<NetworkStock>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct NetworkRow {
    pub id: DbId,
    pub name: String,
    pub city: String,
    pub phone: Option<String>,
    pub reliability_score: i64,
    pub blood_type: Option<BloodType>,
    pub units: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AdminAccount {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterHospitalRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum HospitalError {
    #[error("Hospital not found")]
    NotFound,

    #[error("A hospital with this email is already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for HospitalError {
    fn from(err: sqlx::Error) -> Self {
        HospitalError::DatabaseError(err.to_string())
    }
}

impl From<HospitalError> for AppError {
    fn from(err: HospitalError) -> Self {
        match err {
            HospitalError::NotFound => AppError::NotFound(err.to_string()),
            HospitalError::DuplicateEmail => AppError::Conflict(err.to_string()),
            HospitalError::InvalidCredentials => AppError::Auth(err.to_string()),
            HospitalError::ValidationError(msg) => AppError::ValidationError(msg),
            HospitalError::HashingError(msg) | HospitalError::TokenError(msg) => AppError::Internal(msg),
            HospitalError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
