use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use shared_config::{AppConfig, FulfillmentPolicy};
use shared_database::{connect, connect_in_memory, AppState, DbPool};
use shared_models::auth::AuthContext;
use shared_models::{BloodType, DbId};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub emergency_fulfillment: FulfillmentPolicy,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            emergency_fulfillment: FulfillmentPolicy::Strict,
        }
    }
}

impl TestConfig {
    pub fn partial() -> Self {
        Self {
            emergency_fulfillment: FulfillmentPolicy::Partial,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            emergency_fulfillment: self.emergency_fulfillment,
            ..AppConfig::default()
        }
    }

    /// Fresh in-memory store wrapped in router state.
    pub async fn to_state(&self) -> Arc<AppState> {
        let pool = connect_in_memory()
            .await
            .expect("in-memory store should open");
        Arc::new(AppState::new(self.to_app_config(), pool))
    }

    /// Pooled store in a database file, for tests that need real
    /// concurrent connections.
    pub async fn to_file_state(&self, path: &Path) -> Arc<AppState> {
        let config = AppConfig {
            database_url: format!("sqlite://{}", path.display()),
            ..self.to_app_config()
        };
        let pool = connect(&config).await.expect("file store should open");
        Arc::new(AppState::new(config, pool))
    }
}

pub struct TestHospital {
    pub name: String,
    pub email: String,
    pub city: String,
}

impl TestHospital {
    pub fn new(name: &str, city: &str) -> Self {
        Self {
            name: name.to_string(),
            email: format!("{}@hospitals.test", Uuid::new_v4()),
            city: city.to_string(),
        }
    }

    /// Insert directly, bypassing registration (the password hash is a
    /// placeholder that never verifies).
    pub async fn insert(&self, pool: &DbPool) -> DbId {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO hospitals (name, email, password_hash, city, created_at) \
             VALUES (?, ?, 'unusable', ?, ?) RETURNING id",
        )
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.city)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .expect("hospital insert should succeed")
    }
}

pub async fn seed_stock(
    pool: &DbPool,
    hospital_id: DbId,
    blood_type: BloodType,
    quantity: i64,
    expiry_date: NaiveDate,
) -> DbId {
    let now = Utc::now();
    sqlx::query_scalar::<_, DbId>(
        "INSERT INTO inventory (hospital_id, blood_type, quantity, expiry_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(hospital_id)
    .bind(blood_type)
    .bind(quantity)
    .bind(expiry_date)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .expect("inventory insert should succeed")
}

pub async fn stock_quantity(pool: &DbPool, inventory_id: DbId) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT quantity FROM inventory WHERE id = ?")
        .bind(inventory_id)
        .fetch_one(pool)
        .await
        .expect("inventory row should exist")
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(context: &AuthContext, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(context, secret, exp_hours.unwrap_or(24))
            .expect("test secret is never empty")
    }

    pub fn create_expired_token(context: &AuthContext, secret: &str) -> String {
        Self::create_test_token(context, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(context: &AuthContext) -> String {
        Self::create_test_token(context, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}
