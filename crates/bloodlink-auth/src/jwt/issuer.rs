//! Signs and validates session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bloodlink_core::config::AuthConfig;
use bloodlink_core::error::AppError;

use super::claims::SessionClaims;
use crate::phone::user_id_for_phone;
use crate::verification::PhoneClaim;

/// A signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// Bearer token.
    pub token: String,
    /// When it expires.
    pub expires_at: DateTime<Utc>,
}

/// Mints HS256 session tokens for verified phones and validates them.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_minutes: i64,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl SessionIssuer {
    /// Create an issuer from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl_minutes: config.session_ttl_minutes as i64,
        }
    }

    /// Issue a session for a verified phone.
    pub fn issue(&self, claim: &PhoneClaim) -> Result<SessionToken, AppError> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.ttl_minutes);
        let claims = SessionClaims {
            sub: user_id_for_phone(&claim.phone_number).into_uuid(),
            phone: claim.phone_number.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode session token: {e}")))?;

        Ok(SessionToken {
            token,
            expires_at: exp,
        })
    }

    /// Validate a bearer token and return its claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::authentication(format!("Invalid session token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> PhoneClaim {
        PhoneClaim {
            phone_number: "+22236000001".into(),
            verified_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = SessionIssuer::new(&AuthConfig::default());
        let session = issuer.issue(&claim()).unwrap();
        let claims = issuer.validate(&session.token).unwrap();
        assert_eq!(claims.phone, "+22236000001");
        assert_eq!(claims.user_id(), user_id_for_phone("+22236000001"));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = SessionIssuer::new(&AuthConfig::default());
        let other = SessionIssuer::new(&AuthConfig {
            jwt_secret: "another-secret".into(),
            ..AuthConfig::default()
        });
        let session = other.issue(&claim()).unwrap();
        assert!(issuer.validate(&session.token).is_err());
    }
}
