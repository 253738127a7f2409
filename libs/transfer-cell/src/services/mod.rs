pub mod lifecycle;
pub mod request;

pub use lifecycle::TransferLifecycleService;
pub use request::TransferService;
