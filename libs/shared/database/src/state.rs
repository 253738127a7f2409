use std::sync::Arc;

use shared_config::AppConfig;

use crate::pool::DbPool;

/// Shared router state: configuration plus the connection pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }
}
