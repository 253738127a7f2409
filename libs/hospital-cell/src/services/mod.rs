pub mod auth;
pub mod registry;

pub use auth::AuthService;
pub use registry::HospitalService;
