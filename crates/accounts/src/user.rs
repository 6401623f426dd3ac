use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_auth::Role;
use orgdesk_core::{Email, UserId};
use orgdesk_crud::Row;

/// A user account. Credentials live with the external identity provider;
/// this record only carries profile and global flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    /// Set once the holder followed a verification link.
    #[serde(default)]
    pub email_verified: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// A new active, non-staff account keyed by e-mail.
    pub fn invited(email: Email, first_name: &str, last_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            username: email.as_str().to_string(),
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            is_active: true,
            email_verified: false,
            is_staff: false,
            is_superuser: false,
            date_joined: now,
            last_login: None,
        }
    }

    /// A self-registered account: inactive until its address is verified.
    pub fn registered(
        username: &str,
        email: Email,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.trim().to_string(),
            is_active: false,
            ..Self::invited(email, first_name, last_name, now)
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Global roles granted by the account flags.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Vec::new();
        if self.is_superuser {
            roles.push(Role::SUPERUSER);
        }
        if self.is_staff {
            roles.push(Role::STAFF);
        }
        roles
    }

    pub fn to_row(&self) -> Row {
        Row::new(self.id)
            .with("username", self.username.clone())
            .with("email", self.email.as_str())
            .with("first_name", self.first_name.clone())
            .with("last_name", self.last_name.clone())
            .with("is_active", self.is_active)
            .with("email_verified", self.email_verified)
            .with("is_staff", self.is_staff)
            .with("is_superuser", self.is_superuser)
            .with("date_joined", self.date_joined)
            .with("last_login", self.last_login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invited_users_are_plain_active_accounts() {
        let user = User::invited(Email::parse("Ann@Example.com").unwrap(), " Ann ", "", Utc::now());
        assert_eq!(user.username, "ann@example.com");
        assert_eq!(user.full_name(), "Ann");
        assert!(user.is_active && !user.is_staff && !user.is_superuser);
        assert!(user.roles().is_empty());
    }

    #[test]
    fn registered_users_wait_for_verification() {
        let user = User::registered(" ann ", Email::parse("ann@example.com").unwrap(), "Ann", "Lee", Utc::now());
        assert_eq!(user.username, "ann");
        assert!(!user.is_active && !user.email_verified);
        assert!(user.roles().is_empty());
    }

    #[test]
    fn missing_last_login_is_null_in_rows() {
        let user = User::invited(Email::parse("a@b.io").unwrap(), "", "", Utc::now());
        assert!(user.to_row().get("last_login").is_null());
    }
}
