//! Request/response bodies that are not domain types.

use serde::{Deserialize, Serialize};

use orgdesk_core::{OrganizationId, UserId};
use orgdesk_orgs::{OrganizationAccess, SetupOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchOrganizationRequest {
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleMemberRequest {
    pub is_active: bool,
}

/// An organization as seen by one of its members.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationSummary {
    pub id: OrganizationId,
    pub name: String,
    pub slug: String,
    pub role: &'static str,
    pub is_current: bool,
}

impl OrganizationSummary {
    pub fn from_access(access: &OrganizationAccess, current: Option<OrganizationId>) -> Self {
        Self {
            id: access.organization.id,
            name: access.organization.name.clone(),
            slug: access.organization.slug.as_str().to_string(),
            role: access.membership.role.as_str(),
            is_current: current == Some(access.organization.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchOrganizationResponse {
    pub token: String,
    pub organization: OrganizationSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupStatus {
    pub setup_complete: bool,
    pub site_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupResponse {
    #[serde(flatten)]
    pub outcome: SetupOutcome,
    /// Token for the new superuser, already scoped to the first organization.
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub organization: Option<OrganizationSummary>,
}
