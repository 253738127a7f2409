pub mod activity;
pub mod auth;
pub mod blood;
pub mod error;

/// Database-assigned row identifier shared by every table.
pub type DbId = i64;

pub use activity::{ActivityAction, ActivityEntry};
pub use blood::{BloodType, Urgency};
