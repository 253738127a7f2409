pub mod activity;
pub mod pool;
pub mod schema;
pub mod state;

pub use activity::record_activity;
pub use pool::{connect, connect_in_memory, is_unique_violation, ping, DbPool};
pub use state::AppState;
