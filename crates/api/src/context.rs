use orgdesk_auth::{JwtClaims, Principal};
use orgdesk_crud::RequestContext;
use orgdesk_orgs::OrganizationAccess;

/// Verified identity of a request.
///
/// `principal` carries global roles from the user record (not the token) and,
/// when one is active, the organization role from the re-checked membership.
#[derive(Debug, Clone)]
pub struct PrincipalContext {
    principal: Principal,
    claims: JwtClaims,
    organization: Option<OrganizationAccess>,
}

impl PrincipalContext {
    pub fn new(principal: Principal, claims: JwtClaims, organization: Option<OrganizationAccess>) -> Self {
        Self {
            principal,
            claims,
            organization,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    /// The active organization, if the token named one (or a default exists)
    /// and the membership is still active.
    pub fn organization(&self) -> Option<&OrganizationAccess> {
        self.organization.as_ref()
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::for_principal(self.principal.clone())
    }
}
