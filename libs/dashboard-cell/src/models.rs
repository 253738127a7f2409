use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use inventory_cell::models::{InventoryError, StockSummary};
use shared_models::error::AppError;
use shared_models::{ActivityEntry, BloodType, DbId};

/// Entries shown on the admin activity page.
pub const ADMIN_LOG_LIMIT: i64 = 100;
/// Entries shown on a hospital's own dashboard.
pub const HOSPITAL_RECENT_ACTIVITY: i64 = 10;
/// Entries shown on the admin overview.
pub const ADMIN_RECENT_ACTIVITY: i64 = 5;

/// Demand pressure on one blood type at one hospital.
///
/// `index` is outstanding requested units minus usable units on hand; a
/// positive value means the hospital cannot cover its pending incoming
/// transfer requests for that type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UrgencyIndexEntry {
    pub blood_type: BloodType,
    pub requested: i64,
    pub available: i64,
    pub expiring_soon: i64,
    #[sqlx(skip)]
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RareDonorContact {
    pub donor_id: DbId,
    pub name: String,
    pub phone: String,
    pub blood_type: BloodType,
    pub city: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalDashboard {
    pub hospital_id: DbId,
    pub hospital_name: String,
    pub city: String,
    pub inventory_summary: Vec<StockSummary>,
    pub urgency_index: Vec<UrgencyIndexEntry>,
    pub pending_appointments: i64,
    pub todays_appointments: i64,
    pub pending_incoming_transfers: i64,
    pub pending_outgoing_transfers: i64,
    pub rare_donors: Vec<RareDonorContact>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AdminOverview {
    pub total_hospitals: i64,
    pub total_donors: i64,
    pub pending_appointments: i64,
    pub pending_transfers: i64,
    pub pending_emergencies: i64,
    #[sqlx(skip)]
    pub recent_activity: Vec<ActivityEntry>,
}

/// A hospital as the administrator sees it, with its usable stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub reliability_score: i64,
    pub usable_units: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DonorRecord {
    pub id: DbId,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub phone: String,
    pub city: String,
    pub blood_type: BloodType,
    pub goodwill_score: i64,
    pub last_donation_date: Option<NaiveDate>,
    pub is_rare: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DashboardError {
    #[error("Hospital not found")]
    HospitalNotFound,

    #[error("Administrator account required")]
    AdminOnly,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        DashboardError::DatabaseError(err.to_string())
    }
}

impl From<InventoryError> for DashboardError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::HospitalNotFound => DashboardError::HospitalNotFound,
            other => DashboardError::DatabaseError(other.to_string()),
        }
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::HospitalNotFound => AppError::NotFound(err.to_string()),
            DashboardError::AdminOnly => AppError::Forbidden(err.to_string()),
            DashboardError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
