use serde::{Deserialize, Serialize};

use orgdesk_core::{OrganizationId, UserId};

use crate::{Permission, Role};

/// A principal's verified membership in its active organization.
///
/// Only present once the caller has checked that both the membership and
/// the organization are still active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub organization_id: OrganizationId,
    pub role: Role,
}

/// A fully resolved principal for authorization decisions.
///
/// Built by the transport layer from verified claims plus a membership lookup;
/// nothing in here touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub organization: Option<OrganizationMembership>,
}

impl Principal {
    pub fn new(principal_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = crate::permissions_for_roles(&roles);
        Self {
            principal_id,
            roles,
            permissions,
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization_id: OrganizationId, role: Role) -> Self {
        self.organization = Some(OrganizationMembership {
            organization_id,
            role,
        });
        self
    }

    pub fn is_superuser(&self) -> bool {
        self.roles.iter().any(|r| *r == Role::SUPERUSER)
    }
}
