//! HS256 token encoding and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or incorrectly signed token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret validator.
///
/// Expiry is enforced by [`validate_claims`] against the caller's clock, not by
/// `jsonwebtoken`'s registered `exp` claim (stockroom claims use RFC 3339
/// timestamps).
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Signs claims with the same shared secret.
pub struct Hs256JwtIssuer {
    key: EncodingKey,
}

impl Hs256JwtIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.key,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use stockroom_core::UserId;

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            username: "mia".to_string(),
            role: Role::Manager,
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let now = Utc::now();
        let c = claims(now);
        let token = Hs256JwtIssuer::new(b"secret").issue(&c).unwrap();
        let decoded = Hs256JwtValidator::new(b"secret").validate(&token, now).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn wrong_secret_is_a_decode_error() {
        let now = Utc::now();
        let token = Hs256JwtIssuer::new(b"secret").issue(&claims(now)).unwrap();
        let err = Hs256JwtValidator::new(b"other").validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenError::Decode(_)));
    }

    #[test]
    fn expired_token_is_rejected_after_signature_check() {
        let now = Utc::now();
        let token = Hs256JwtIssuer::new(b"secret").issue(&claims(now)).unwrap();
        let later = now + Duration::hours(2);
        let err = Hs256JwtValidator::new(b"secret").validate(&token, later).unwrap_err();
        assert!(matches!(err, TokenError::Claims(TokenValidationError::Expired)));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Hs256JwtValidator::new(b"secret")
            .validate("not.a.jwt", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenError::Decode(_)));
    }
}
