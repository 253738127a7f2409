use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_database::AppState;
use shared_models::auth::AuthContext;
use shared_models::error::AppError;
use shared_models::DbId;

use crate::jwt::validate_token;

/// Decode the bearer token and attach the caller's `AuthContext` to the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let context = validate_token(token, &state.config.jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

pub fn require_hospital(context: &AuthContext) -> Result<DbId, AppError> {
    context
        .hospital_id()
        .ok_or_else(|| AppError::Forbidden("Hospital account required".to_string()))
}

pub fn require_admin(context: &AuthContext) -> Result<(), AppError> {
    if context.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Administrator account required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn role_guards() {
        let hospital = AuthContext::hospital(7);
        let admin = AuthContext::admin(1);

        assert_eq!(require_hospital(&hospital).unwrap(), 7);
        assert_matches!(require_hospital(&admin), Err(AppError::Forbidden(_)));
        assert!(require_admin(&admin).is_ok());
        assert_matches!(require_admin(&hospital), Err(AppError::Forbidden(_)));
    }
}
