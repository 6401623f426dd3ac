use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_auth::Role;
use orgdesk_core::{MembershipId, OrganizationId, Slug, UserId};

use crate::{ErrorCode, ServiceError};

/// A tenant. Deactivated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub slug: Slug,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>, slug: Slug, now: DateTime<Utc>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into(),
            slug,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Admin,
    #[default]
    Member,
}

impl MembershipRole {
    /// Exactly `admin` or `member`.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(ServiceError::new(
                ErrorCode::InvalidRole,
                format!("invalid role '{other}'"),
            )
            .on_field("role")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// The organization-scoped authorization role.
    pub fn as_role(self) -> Role {
        match self {
            Self::Admin => Role::ORG_ADMIN,
            Self::Member => Role::ORG_MEMBER,
        }
    }
}

/// A user's role in one organization. Unique per (user, organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: MembershipRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        role: MembershipRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            organization_id,
            role,
            is_active: true,
            created_at: now,
        }
    }

    pub fn is_active_admin(&self) -> bool {
        self.is_active && self.role == MembershipRole::Admin
    }
}

/// An organization together with the caller's membership in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationAccess {
    pub organization: Organization,
    pub membership: Membership,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_exact() {
        assert_eq!(MembershipRole::parse("admin").unwrap(), MembershipRole::Admin);
        for raw in ["Admin", " member", "owner", ""] {
            assert_eq!(MembershipRole::parse(raw).unwrap_err().code, ErrorCode::InvalidRole);
        }
    }

    #[test]
    fn only_active_admins_count() {
        let mut m = Membership::new(UserId::new(), OrganizationId::new(), MembershipRole::Admin, Utc::now());
        assert!(m.is_active_admin());
        m.is_active = false;
        assert!(!m.is_active_admin());
    }
}
