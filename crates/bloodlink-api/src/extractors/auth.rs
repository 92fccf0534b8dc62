//! `AuthUser` extractor: pulls the session token from the Authorization
//! header and validates it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use bloodlink_auth::SessionClaims;
use bloodlink_core::error::AppError;
use bloodlink_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionClaims);

impl AuthUser {
    /// The caller's user id.
    pub fn user_id(&self) -> UserId {
        self.0.user_id()
    }

    /// The caller's verified phone number.
    pub fn phone(&self) -> &str {
        &self.0.phone
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let claims = state.engine.authenticate(token)?;
        Ok(AuthUser(claims))
    }
}
