use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::{BloodType, DbId};

// ==============================================================================
// LEDGER ROWS
// ==============================================================================

/// Upper bound on one ledger bucket and on any single stock movement.
pub const MAX_UNITS: i64 = 10_000;

/// One (hospital, blood type, expiry) bucket of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InventoryUnit {
    pub id: DbId,
    pub hospital_id: DbId,
    pub blood_type: BloodType,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Expiring,
    Low,
    Healthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockEntry {
    #[serde(flatten)]
    pub unit: InventoryUnit,
    pub status: StockStatus,
}

/// Thresholds used to classify ledger rows.
#[derive(Debug, Clone, Copy)]
pub struct StockRules {
    pub expiring_window_days: i64,
    pub low_stock_threshold: i64,
}

impl Default for StockRules {
    fn default() -> Self {
        Self {
            expiring_window_days: 7,
            low_stock_threshold: 5,
        }
    }
}

impl StockRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            expiring_window_days: config.expiring_window_days,
            low_stock_threshold: config.low_stock_threshold,
        }
    }

    /// Last expiry date that still counts as "expiring soon".
    pub fn expiring_cutoff(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.expiring_window_days)
    }

    /// First matching rule wins: expiring, then low, then healthy.
    pub fn classify(&self, expiry_date: NaiveDate, quantity: i64, today: NaiveDate) -> StockStatus {
        if expiry_date <= self.expiring_cutoff(today) {
            StockStatus::Expiring
        } else if quantity < self.low_stock_threshold {
            StockStatus::Low
        } else {
            StockStatus::Healthy
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStockRequest {
    pub blood_type: BloodType,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockSummary {
    pub blood_type: BloodType,
    pub total_units: i64,
    pub expiring_soon: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BloodAvailability {
    pub blood_type: BloodType,
    pub total_units: i64,
}

// ==============================================================================
// ALLOCATION MODELS
// ==============================================================================

/// Which ledger rows an allocation may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationScope {
    /// Only the given hospital's rows.
    Hospital(DbId),
    /// Every hospital's rows; on equal expiry the preferred hospital goes first.
    Network { preferred_hospital: DbId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: DbId,
    pub hospital_id: DbId,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub inventory_id: DbId,
    pub hospital_id: DbId,
    pub expiry_date: NaiveDate,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub blood_type: BloodType,
    pub requested: i64,
    pub draws: Vec<Draw>,
}

impl Allocation {
    pub fn allocated(&self) -> i64 {
        self.draws.iter().map(|draw| draw.units).sum()
    }

    pub fn shortfall(&self) -> i64 {
        (self.requested - self.allocated()).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum InventoryError {
    #[error("Hospital not found")]
    HospitalNotFound,

    #[error("Only hospital accounts can manage stock")]
    Unauthorized,

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

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::DatabaseError(err.to_string())
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::HospitalNotFound => AppError::NotFound(err.to_string()),
            InventoryError::Unauthorized => AppError::Forbidden(err.to_string()),
            InventoryError::ValidationError(msg) => AppError::ValidationError(msg),
            InventoryError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            InventoryError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap() + Duration::days(offset)
    }

    #[test]
    fn expiring_wins_regardless_of_quantity() {
        let rules = StockRules::default();
        assert_eq!(rules.classify(day(3), 10, day(0)), StockStatus::Expiring);
        assert_eq!(rules.classify(day(3), 1, day(0)), StockStatus::Expiring);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let rules = StockRules::default();
        assert_eq!(rules.classify(day(7), 50, day(0)), StockStatus::Expiring);
        assert_eq!(rules.classify(day(8), 50, day(0)), StockStatus::Healthy);
        // Already expired rows are still reported as expiring.
        assert_eq!(rules.classify(day(-2), 50, day(0)), StockStatus::Expiring);
    }

    #[test]
    fn low_then_healthy() {
        let rules = StockRules::default();
        assert_eq!(rules.classify(day(30), 4, day(0)), StockStatus::Low);
        assert_eq!(rules.classify(day(30), 5, day(0)), StockStatus::Healthy);
    }

    #[test]
    fn allocation_reports_shortfall() {
        let allocation = Allocation {
            blood_type: BloodType::OPositive,
            requested: 10,
            draws: vec![Draw { inventory_id: 1, hospital_id: 1, expiry_date: day(2), units: 6 }],
        };
        assert_eq!(allocation.allocated(), 6);
        assert_eq!(allocation.shortfall(), 4);
        assert!(!allocation.is_complete());
    }
}
