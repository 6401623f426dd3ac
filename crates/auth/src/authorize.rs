use thiserror::Error;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no active organization")]
    NoActiveOrganization,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: requires organization role in [{0}]")]
    RoleRequired(String),
}

/// Authorize a principal against a single permission.
///
/// - No IO
/// - No panics
/// - Pure policy check
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Require the principal's role in its active organization to be one of `roles`.
pub fn authorize_any_role(principal: &Principal, roles: &[Role]) -> Result<(), AuthzError> {
    let membership = principal
        .organization
        .as_ref()
        .ok_or(AuthzError::NoActiveOrganization)?;

    if roles.contains(&membership.role) {
        Ok(())
    } else {
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        Err(AuthzError::RoleRequired(names.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdesk_core::{OrganizationId, UserId};

    fn principal(roles: Vec<Role>) -> Principal {
        Principal::new(UserId::new(), roles)
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(vec![Role::SUPERUSER]);
        assert!(authorize(&p, &Permission::new("settings.change")).is_ok());
    }

    #[test]
    fn missing_permission_is_named_in_error() {
        let p = principal(vec![]);
        let err = authorize(&p, &Permission::new("users.view")).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("users.view".to_string()));
    }

    #[test]
    fn organization_role_requires_an_active_organization() {
        let p = principal(vec![]);
        assert_eq!(
            authorize_any_role(&p, &[Role::ORG_ADMIN]),
            Err(AuthzError::NoActiveOrganization)
        );

        let member = principal(vec![]).with_organization(OrganizationId::new(), Role::ORG_MEMBER);
        assert!(authorize_any_role(&member, &[Role::ORG_ADMIN]).is_err());
        assert!(authorize_any_role(&member, &[Role::ORG_ADMIN, Role::ORG_MEMBER]).is_ok());
    }

    #[test]
    fn superuser_still_needs_membership_for_role_checks() {
        let p = principal(vec![Role::SUPERUSER]);
        assert!(authorize_any_role(&p, &[Role::ORG_ADMIN]).is_err());
    }
}
