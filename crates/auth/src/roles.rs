use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Two families share this type: *global* roles carried in the token
/// (`superuser`, `staff`) and *organization* roles held through a membership
/// (`admin`, `member`). Both stay opaque strings at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const SUPERUSER: Role = Role(Cow::Borrowed("superuser"));
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));
    pub const ORG_ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const ORG_MEMBER: Role = Role(Cow::Borrowed("member"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
