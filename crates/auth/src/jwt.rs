//! HS256 token codec.
//!
//! Signature checks go through `jsonwebtoken`; the time window is checked by
//! [`validate_claims`] against the caller's clock so tests stay deterministic.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Verifies bearer tokens into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret HS256 signer/verifier.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Our claims use RFC 3339 timestamps instead of numeric `exp`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use orgdesk_core::{OrganizationId, UserId};

    #[test]
    fn issued_tokens_validate_with_the_same_secret() {
        let jwt = Hs256Jwt::new(b"secret");
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), vec![Role::STAFF], now, Duration::minutes(5))
            .switched_to(OrganizationId::new(), now, Duration::minutes(5));

        let token = jwt.issue(&claims).unwrap();
        assert_eq!(jwt.validate(&token, now).unwrap(), claims);
    }

    #[test]
    fn other_secret_is_rejected() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), vec![], now, Duration::minutes(5));
        let token = Hs256Jwt::new(b"one").issue(&claims).unwrap();

        let err = Hs256Jwt::new(b"two").validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected_after_signature_check() {
        let now = Utc::now();
        let jwt = Hs256Jwt::new(b"secret");
        let claims = JwtClaims::new(UserId::new(), vec![], now, Duration::minutes(5));
        let token = jwt.issue(&claims).unwrap();

        let err = jwt.validate(&token, now + Duration::minutes(10)).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }
}
