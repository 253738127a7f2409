use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DbId;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub role: Role,
    pub name: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hospital,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hospital => write!(f, "hospital"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Who is calling, decoded from the bearer token for the lifetime of one
/// request and handed to every workflow call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub subject_id: DbId,
    pub role: Role,
    pub name: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl AuthContext {
    pub fn hospital(hospital_id: DbId) -> Self {
        Self {
            subject_id: hospital_id,
            role: Role::Hospital,
            name: None,
            issued_at: None,
        }
    }

    pub fn admin(admin_id: DbId) -> Self {
        Self {
            subject_id: admin_id,
            role: Role::Admin,
            name: None,
            issued_at: None,
        }
    }

    /// The hospital acting in this request, if the caller is one.
    pub fn hospital_id(&self) -> Option<DbId> {
        match self.role {
            Role::Hospital => Some(self.subject_id),
            Role::Admin => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub subject_id: DbId,
    pub role: Role,
}
