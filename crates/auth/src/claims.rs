use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orgdesk_core::{OrganizationId, UserId};

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// `organization_id` is the tenant the holder last switched to; it is a hint
/// only and gets re-verified against the membership store on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Active organization selected by the holder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,

    /// Global roles (`superuser`, `staff`).
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn new(sub: UserId, roles: Vec<Role>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            organization_id: None,
            roles,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    /// Same identity, scoped to another organization, with a fresh validity window.
    pub fn switched_to(
        &self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: self.sub,
            organization_id: Some(organization_id),
            roles: self.roles.clone(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate JWT claims.
///
/// This validates the *claims* only; signature checks live in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_checks() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), vec![], now, Duration::minutes(5));

        assert!(validate_claims(&claims, now).is_ok());
        assert_eq!(
            validate_claims(&claims, now - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(5)),
            Err(TokenValidationError::Expired)
        );

        let inverted = JwtClaims::new(UserId::new(), vec![], now, Duration::minutes(-1));
        assert_eq!(
            validate_claims(&inverted, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn switching_keeps_identity_and_roles() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), vec![Role::STAFF], now, Duration::minutes(5));
        let org = OrganizationId::new();

        let switched = claims.switched_to(org, now, Duration::minutes(30));
        assert_eq!(switched.sub, claims.sub);
        assert_eq!(switched.roles, claims.roles);
        assert_eq!(switched.organization_id, Some(org));
        assert_eq!(switched.expires_at, now + Duration::minutes(30));
    }
}
