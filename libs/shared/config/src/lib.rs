use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How emergency approval behaves when the network holds fewer matching
/// units than the request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentPolicy {
    /// Fail the approval and leave the store untouched.
    Strict,
    /// Allocate whatever exists and report the shortfall.
    Partial,
}

impl FromStr for FulfillmentPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FulfillmentPolicy::Strict),
            "partial" => Ok(FulfillmentPolicy::Partial),
            other => Err(format!("unknown fulfillment policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_port: u16,
    pub token_ttl_hours: i64,
    pub expiring_window_days: i64,
    pub low_stock_threshold: i64,
    pub donation_interval_days: i64,
    pub emergency_fulfillment: FulfillmentPolicy,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://blood_network.db?mode=rwc".to_string(),
            jwt_secret: String::new(),
            server_port: 3000,
            token_ttl_hours: 24,
            expiring_window_days: 7,
            low_stock_threshold: 5,
            donation_interval_days: 90,
            emergency_fulfillment: FulfillmentPolicy::Strict,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using {}", defaults.database_url);
                    defaults.database_url.clone()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: parsed_var("SERVER_PORT", defaults.server_port),
            token_ttl_hours: parsed_var("TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            expiring_window_days: parsed_var("EXPIRING_WINDOW_DAYS", defaults.expiring_window_days),
            low_stock_threshold: parsed_var("LOW_STOCK_THRESHOLD", defaults.low_stock_threshold),
            donation_interval_days: parsed_var("DONATION_INTERVAL_DAYS", defaults.donation_interval_days),
            emergency_fulfillment: parsed_var("EMERGENCY_FULFILLMENT_POLICY", defaults.emergency_fulfillment),
            admin_username: env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty() && !self.jwt_secret.is_empty()
    }

    pub fn has_bootstrap_admin(&self) -> bool {
        self.admin_username.is_some() && self.admin_password.is_some()
    }
}

fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
