use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::DbId;

/// Kinds of state change written to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityAction {
    HospitalRegistered,
    StockIn,
    StockOut,
    AppointmentBooked,
    AppointmentStatusChanged,
    TransferRequested,
    TransferStatusChanged,
    EmergencySubmitted,
    EmergencyStatusChanged,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityAction::HospitalRegistered => "hospital_registered",
            ActivityAction::StockIn => "stock_in",
            ActivityAction::StockOut => "stock_out",
            ActivityAction::AppointmentBooked => "appointment_booked",
            ActivityAction::AppointmentStatusChanged => "appointment_status_changed",
            ActivityAction::TransferRequested => "transfer_requested",
            ActivityAction::TransferStatusChanged => "transfer_status_changed",
            ActivityAction::EmergencySubmitted => "emergency_submitted",
            ActivityAction::EmergencyStatusChanged => "emergency_status_changed",
        };
        f.write_str(label)
    }
}

/// One row of the append-only activity log, joined with the hospital name
/// when the entry belongs to a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    pub id: DbId,
    pub hospital_id: Option<DbId>,
    pub hospital_name: Option<String>,
    pub action: ActivityAction,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}
