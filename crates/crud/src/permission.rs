//! Declarative permission specs for list/create/edit/delete.

use orgdesk_auth::{Permission, Principal, Role, authorize, authorize_any_role};

use crate::CrudError;

/// Per-request context handed to filters, scopes and permission checks.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn for_principal(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }
}

/// Who may perform an action.
///
/// Textual form (see [`PermissionSpec::parse`]):
/// - empty → open
/// - `role:admin,member` → role in the active organization
/// - anything else → a permission string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PermissionSpec {
    #[default]
    Open,
    OrganizationRoles(Vec<Role>),
    Permission(Permission),
}

impl PermissionSpec {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Open;
        }
        if let Some(list) = raw.strip_prefix("role:") {
            let roles = list
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| Role::new(r.to_string()))
                .collect();
            return Self::OrganizationRoles(roles);
        }
        Self::Permission(Permission::new(raw.to_string()))
    }

    pub fn permission(name: &'static str) -> Self {
        Self::Permission(Permission::new(name))
    }

    /// Anonymous callers only pass `Open`.
    pub fn check(&self, ctx: &RequestContext) -> Result<(), CrudError> {
        let principal = match (self, &ctx.principal) {
            (Self::Open, _) => return Ok(()),
            (_, None) => return Err(CrudError::Unauthenticated),
            (_, Some(p)) => p,
        };

        let outcome = match self {
            Self::Open => Ok(()),
            Self::OrganizationRoles(roles) => authorize_any_role(principal, roles),
            Self::Permission(perm) => authorize(principal, perm),
        };
        outcome.map_err(|e| CrudError::Forbidden(e.to_string()))
    }

    pub fn allows(&self, ctx: &RequestContext) -> bool {
        self.check(ctx).is_ok()
    }
}
