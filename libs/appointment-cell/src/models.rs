use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use shared_models::error::AppError;
use shared_models::{BloodType, DbId};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: DbId,
    pub donor_id: DbId,
    pub hospital_id: DbId,
    pub preferred_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Rejected | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Approved => write!(f, "Approved"),
            AppointmentStatus::Rejected => write!(f, "Rejected"),
            AppointmentStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Donor {
    pub id: DbId,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub phone: String,
    pub city: String,
    pub blood_type: BloodType,
    pub goodwill_score: i64,
    pub last_donation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment row joined with its donor, as shown to the owning hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AppointmentView {
    pub id: DbId,
    pub hospital_id: DbId,
    pub preferred_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub donor_id: DbId,
    pub donor_name: String,
    pub donor_age: i64,
    pub donor_gender: String,
    pub donor_phone: String,
    pub donor_city: String,
    pub blood_type: BloodType,
    pub goodwill_score: i64,
    pub is_rare: bool,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Donor details as submitted on the public booking form. Fields arrive as
/// free text and are validated by the booking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorInfo {
    pub name: String,
    pub age: i64,
    #[serde(default)]
    pub gender: String,
    pub phone: String,
    #[serde(default)]
    pub city: String,
    pub blood_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(flatten)]
    pub donor: DonorInfo,
    pub hospital_id: DbId,
    pub preferred_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub donor_id: DbId,
    pub new_donor: bool,
    pub rare_donor: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Hospital not found")]
    HospitalNotFound,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Donor must wait {remaining_days} more days before donating again")]
    DonationIntervalNotElapsed { remaining_days: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AppointmentError {
    fn from(err: sqlx::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::HospitalNotFound => {
                AppError::NotFound(err.to_string())
            }
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } => {
                AppError::InvalidTransition(err.to_string())
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DonationIntervalNotElapsed { .. } => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// VALIDATION RULES
// ==============================================================================

pub const MIN_DONOR_AGE: i64 = 18;
pub const MAX_DONOR_AGE: i64 = 65;
