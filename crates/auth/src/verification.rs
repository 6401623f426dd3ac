//! Signed e-mail verification links.
//!
//! The key is derived from the access-token secret with a fixed label, so a
//! verification token never validates as a bearer token and vice versa.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use orgdesk_core::UserId;

use crate::{TokenError, TokenValidationError};

const KEY_LABEL: &[u8] = b"orgdesk.verify-email";
const PURPOSE: &str = "verify_email";

/// Links stay valid for a day.
pub const VERIFICATION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationClaims {
    pub sub: UserId,
    /// Address the link was sent to; a later e-mail change voids the link.
    pub email: String,
    pub purpose: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationClaims {
    fn check_window(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        if self.expires_at <= self.issued_at {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        if now < self.issued_at {
            return Err(TokenValidationError::NotYetValid);
        }
        if now >= self.expires_at {
            return Err(TokenValidationError::Expired);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl EmailVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::hours(VERIFICATION_TTL_HOURS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        let mut key = Vec::with_capacity(secret.len() + KEY_LABEL.len() + 1);
        key.extend_from_slice(KEY_LABEL);
        key.push(b':');
        key.extend_from_slice(secret);
        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
            ttl,
        }
    }

    pub fn issue(&self, user: UserId, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = VerificationClaims {
            sub: user,
            email: email.to_string(),
            purpose: PURPOSE.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerificationClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<VerificationClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        if data.claims.purpose != PURPOSE {
            return Err(TokenError::Invalid(format!("unexpected purpose {:?}", data.claims.purpose)));
        }
        data.claims.check_window(now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for EmailVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmailVerifier").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hs256Jwt, JwtClaims, JwtValidator};

    #[test]
    fn links_verify_within_a_day() {
        let verifier = EmailVerifier::new(b"secret");
        let now = Utc::now();
        let user = UserId::new();
        let token = verifier.issue(user, "ann@example.com", now).unwrap();

        let claims = verifier.verify(&token, now + Duration::hours(23)).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email, "ann@example.com");

        let err = verifier.verify(&token, now + Duration::hours(24)).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn links_and_access_tokens_do_not_mix() {
        let now = Utc::now();
        let verifier = EmailVerifier::new(b"secret");
        let jwt = Hs256Jwt::new(b"secret");

        let link = verifier.issue(UserId::new(), "ann@example.com", now).unwrap();
        assert!(matches!(jwt.validate(&link, now), Err(TokenError::Invalid(_))));

        let access = jwt
            .issue(&JwtClaims::new(UserId::new(), vec![], now, Duration::minutes(5)))
            .unwrap();
        assert!(matches!(verifier.verify(&access, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn tampered_links_are_rejected() {
        let verifier = EmailVerifier::new(b"secret");
        let token = verifier.issue(UserId::new(), "ann@example.com", Utc::now()).unwrap();
        let other = EmailVerifier::new(b"other");
        assert!(matches!(other.verify(&token, Utc::now()), Err(TokenError::Invalid(_))));
    }
}
