use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque `module.action` strings (e.g. `"items.change"`).
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const STAFF_PERMISSIONS: &[&str] = &[
    "items.view",
    "items.add",
    "items.change",
    "items.delete",
    "users.view",
    "users.change",
    "settings.view",
];

const DEFAULT_PERMISSIONS: &[&str] = &["items.view"];

/// Static global-role → permission mapping.
///
/// `superuser` grants the wildcard, `staff` the back-office set and every
/// other authenticated user can browse items. The result is de-duplicated and
/// sorted.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| *r == Role::SUPERUSER) {
        return vec![Permission::WILDCARD];
    }

    let mut names: Vec<&'static str> = DEFAULT_PERMISSIONS.to_vec();
    if roles.iter().any(|r| *r == Role::STAFF) {
        names.extend_from_slice(STAFF_PERMISSIONS);
    }
    names.sort_unstable();
    names.dedup();
    names.into_iter().map(Permission::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_gets_wildcard_only() {
        let perms = permissions_for_roles(&[Role::STAFF, Role::SUPERUSER]);
        assert_eq!(perms, vec![Permission::WILDCARD]);
    }

    #[test]
    fn staff_set_is_deduplicated() {
        let perms = permissions_for_roles(&[Role::STAFF]);
        let views = perms.iter().filter(|p| p.as_str() == "items.view").count();
        assert_eq!(views, 1);
        assert!(perms.iter().any(|p| p.as_str() == "users.change"));
        assert!(!perms.iter().any(|p| p.as_str() == "settings.change"));
    }

    #[test]
    fn unknown_roles_fall_back_to_browsing() {
        let perms = permissions_for_roles(&[Role::new("auditor")]);
        assert_eq!(perms, vec![Permission::new("items.view")]);
    }
}
