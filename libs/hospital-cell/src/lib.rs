pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{auth_routes, hospital_routes};
pub use services::{AuthService, HospitalService};
