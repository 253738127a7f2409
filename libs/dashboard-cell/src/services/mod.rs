pub mod aggregation;

pub use aggregation::DashboardService;
