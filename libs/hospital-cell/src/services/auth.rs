use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::{AppState, DbPool};
use shared_models::auth::{AuthContext, TokenResponse};
use shared_utils::jwt::{issue_token, validate_token};
use shared_utils::password::{hash_password, verify_password};

use crate::models::{AdminAccount, AdminLoginRequest, Hospital, HospitalError, LoginRequest};

pub struct AuthService {
    db: DbPool,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            jwt_secret: state.config.jwt_secret.clone(),
            token_ttl_hours: state.config.token_ttl_hours,
        }
    }

    fn token_for(&self, context: AuthContext) -> Result<TokenResponse, HospitalError> {
        let access_token = issue_token(&context, &self.jwt_secret, self.token_ttl_hours)
            .map_err(HospitalError::TokenError)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl_hours * 3600,
            subject_id: context.subject_id,
            role: context.role,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, HospitalError> {
        let email = request.email.trim().to_lowercase();

        let hospital = sqlx::query_as::<_, Hospital>("SELECT * FROM hospitals WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;

        // Unknown email and wrong password look the same to the caller.
        let hospital = match hospital {
            Some(hospital) => hospital,
            None => {
                debug!("Login attempt for unknown email");
                return Err(HospitalError::InvalidCredentials);
            }
        };

        let verified = verify_password(&request.password, &hospital.password_hash).unwrap_or(false);
        if !verified {
            warn!("Failed login for hospital {}", hospital.id);
            return Err(HospitalError::InvalidCredentials);
        }

        info!("Hospital {} logged in", hospital.id);

        self.token_for(AuthContext {
            name: Some(hospital.name),
            ..AuthContext::hospital(hospital.id)
        })
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn admin_login(&self, request: AdminLoginRequest) -> Result<TokenResponse, HospitalError> {
        let admin = sqlx::query_as::<_, AdminAccount>(
            "SELECT id, username, password_hash FROM admins WHERE username = ?",
        )
        .bind(request.username.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(HospitalError::InvalidCredentials)?;

        if !verify_password(&request.password, &admin.password_hash).unwrap_or(false) {
            warn!("Failed admin login for {}", admin.username);
            return Err(HospitalError::InvalidCredentials);
        }

        info!("Administrator {} logged in", admin.username);

        self.token_for(AuthContext {
            name: Some(admin.username),
            ..AuthContext::admin(admin.id)
        })
    }

    /// Decode a bearer token without touching the store.
    pub fn verify(&self, token: &str) -> Result<AuthContext, HospitalError> {
        validate_token(token, &self.jwt_secret).map_err(|_| HospitalError::InvalidCredentials)
    }

    /// Create or re-key the configured administrator. Returns `false` when no
    /// credentials are configured.
    pub async fn bootstrap_admin(db: &DbPool, config: &AppConfig) -> Result<bool, HospitalError> {
        let (username, password) = match (&config.admin_username, &config.admin_password) {
            (Some(username), Some(password)) => (username, password),
            _ => {
                debug!("No bootstrap administrator configured");
                return Ok(false);
            }
        };

        let password_hash =
            hash_password(password).map_err(|e| HospitalError::HashingError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (username) DO UPDATE SET password_hash = excluded.password_hash",
        )
        .bind(username.trim())
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(db)
        .await?;

        info!("Bootstrap administrator {} is ready", username.trim());
        Ok(true)
    }
}
