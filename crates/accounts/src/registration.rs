//! Self-service sign-up and e-mail verification.
//!
//! Registered accounts start inactive. A signed link goes out through a
//! [`VerificationNotifier`]; following it activates the account once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_auth::EmailVerifier;
use orgdesk_core::{Email, FieldErrors, StoreError, UserId};

use crate::{AccountError, User, UserStore};

pub const MAX_USERNAME: usize = 150;
pub const MAX_NAME: usize = 150;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

struct ValidRegistration {
    username: String,
    email: Email,
}

/// Letters, digits and `@.+-_`, like the usernames the identity provider issues.
pub(crate) fn check_username(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let username = raw.trim();
    if username.is_empty() {
        errors.add("username", "this field is required");
        return None;
    }
    if username.chars().count() > MAX_USERNAME {
        errors.add("username", format!("ensure this value has at most {MAX_USERNAME} characters"));
        return None;
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        errors.add(
            "username",
            "enter a valid username: letters, numbers and @/./+/-/_ only",
        );
        return None;
    }
    Some(username.to_string())
}

pub(crate) fn check_name(field: &'static str, raw: &str, errors: &mut FieldErrors) {
    if raw.trim().chars().count() > MAX_NAME {
        errors.add(field, format!("ensure this value has at most {MAX_NAME} characters"));
    }
}

impl RegistrationForm {
    fn validate(&self) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = check_username(&self.username, &mut errors);
        let email = errors.check("email", Email::parse(&self.email));
        check_name("first_name", &self.first_name, &mut errors);
        check_name("last_name", &self.last_name, &mut errors);

        match (username, email) {
            (Some(username), Some(email)) if errors.is_empty() => Ok(ValidRegistration { username, email }),
            _ => Err(errors),
        }
    }
}

/// Delivers verification links. The default implementation only logs them.
#[async_trait]
pub trait VerificationNotifier: Send + Sync {
    async fn send_verification(&self, user: &User, token: &str) -> Result<(), String>;
}

/// Writes the link to the log instead of mailing it.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    base_url: String,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn link(&self, token: &str) -> String {
        format!("{}/accounts/verify/{}", self.base_url, token)
    }
}

#[async_trait]
impl VerificationNotifier for LogNotifier {
    async fn send_verification(&self, user: &User, token: &str) -> Result<(), String> {
        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            link = %self.link(token),
            "verification e-mail"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub user_id: UserId,
    pub username: String,
    pub email: Email,
    pub is_active: bool,
}

pub async fn register_user(
    store: &dyn UserStore,
    verifier: &EmailVerifier,
    notifier: &dyn VerificationNotifier,
    form: &RegistrationForm,
    now: DateTime<Utc>,
) -> Result<Registration, AccountError> {
    let valid = form.validate()?;

    let mut taken = FieldErrors::new();
    if store.find_by_username(&valid.username).await?.is_some() {
        taken.add("username", "a user with that username already exists");
    }
    if store.find_by_email(&valid.email).await?.is_some() {
        taken.add("email", "a user with this e-mail already exists");
    }
    if !taken.is_empty() {
        return Err(taken.into());
    }

    let user = User::registered(&valid.username, valid.email, &form.first_name, &form.last_name, now);
    match store.insert(&user).await {
        Ok(()) => {}
        // Lost a race with another sign-up for the same name or address.
        Err(StoreError::Conflict(_)) => {
            return Err(FieldErrors::single("email", "a user with this e-mail already exists").into());
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user_id = %user.id, "user registered");

    let token = verifier
        .issue(user.id, user.email.as_str(), now)
        .map_err(|e| AccountError::Signing(e.to_string()))?;
    if let Err(e) = notifier.send_verification(&user, &token).await {
        tracing::error!(user_id = %user.id, error = %e, "verification e-mail not sent");
        return Err(AccountError::Delivery(e));
    }

    Ok(Registration {
        user_id: user.id,
        username: user.username,
        email: user.email,
        is_active: user.is_active,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

/// Activate the account a verification link names.
///
/// A link is void once the account's address changed. A second visit is a
/// no-op, so it never re-activates an account an admin has since disabled.
pub async fn verify_email(
    store: &dyn UserStore,
    verifier: &EmailVerifier,
    token: &str,
    now: DateTime<Utc>,
) -> Result<VerificationOutcome, AccountError> {
    let claims = verifier.verify(token, now).map_err(|e| {
        tracing::debug!(error = %e, "verification link rejected");
        AccountError::InvalidToken
    })?;

    let user = match store.get(claims.sub).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(AccountError::InvalidToken),
        Err(e) => return Err(e.into()),
    };
    if user.email.as_str() != claims.email {
        return Err(AccountError::InvalidToken);
    }
    if user.email_verified {
        return Ok(VerificationOutcome::AlreadyVerified);
    }

    store.mark_verified(user.id).await?;
    tracing::info!(user_id = %user.id, "e-mail verified");
    Ok(VerificationOutcome::Verified)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Duration;
    use orgdesk_core::StoreResult;

    use super::*;

    /// Users keyed by id, uniqueness checked like the real stores.
    #[derive(Default)]
    pub(crate) struct Users(pub Mutex<BTreeMap<UserId, User>>);

    #[async_trait]
    impl UserStore for Users {
        async fn get(&self, id: UserId) -> StoreResult<User> {
            self.0.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound("user"))
        }

        async fn find_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
            Ok(self.0.lock().unwrap().values().find(|u| &u.email == email).cloned())
        }

        async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            Ok(self.0.lock().unwrap().values().find(|u| u.username == username).cloned())
        }

        async fn insert(&self, user: &User) -> StoreResult<()> {
            let mut users = self.0.lock().unwrap();
            if users.values().any(|u| u.email == user.email || u.username == user.username) {
                return Err(StoreError::Conflict("taken".into()));
            }
            users.insert(user.id, user.clone());
            Ok(())
        }

        async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
            let mut users = self.0.lock().unwrap();
            users.get_mut(&id).ok_or(StoreError::NotFound("user"))?.is_active = active;
            Ok(())
        }

        async fn save_profile(&self, user: &User) -> StoreResult<()> {
            let mut users = self.0.lock().unwrap();
            if users.values().any(|u| u.id != user.id && u.email == user.email) {
                return Err(StoreError::Conflict("taken".into()));
            }
            let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound("user"))?;
            stored.first_name = user.first_name.clone();
            stored.last_name = user.last_name.clone();
            stored.email = user.email.clone();
            Ok(())
        }

        async fn mark_verified(&self, id: UserId) -> StoreResult<()> {
            let mut users = self.0.lock().unwrap();
            let user = users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
            user.is_active = true;
            user.email_verified = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<String>>);

    #[async_trait]
    impl VerificationNotifier for Outbox {
        async fn send_verification(&self, _: &User, token: &str) -> Result<(), String> {
            self.0.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    struct Offline;

    #[async_trait]
    impl VerificationNotifier for Offline {
        async fn send_verification(&self, _: &User, _: &str) -> Result<(), String> {
            Err("smtp unreachable".into())
        }
    }

    fn form(username: &str, email: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
        }
    }

    #[tokio::test]
    async fn sign_up_then_verify_activates_once() {
        let store = Users::default();
        let verifier = EmailVerifier::new(b"secret");
        let outbox = Outbox::default();
        let now = Utc::now();

        let reg = register_user(&store, &verifier, &outbox, &form("ann", "Ann@Example.com"), now)
            .await
            .unwrap();
        assert!(!reg.is_active);
        assert_eq!(reg.email.as_str(), "ann@example.com");
        assert!(!store.get(reg.user_id).await.unwrap().is_active);

        let token = outbox.0.lock().unwrap()[0].clone();
        let outcome = verify_email(&store, &verifier, &token, now + Duration::hours(1)).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::Verified);
        let user = store.get(reg.user_id).await.unwrap();
        assert!(user.is_active && user.email_verified);

        // An admin disables the account; the old link must not undo that.
        store.set_active(reg.user_id, false).await.unwrap();
        let outcome = verify_email(&store, &verifier, &token, now + Duration::hours(2)).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
        assert!(!store.get(reg.user_id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn taken_names_and_addresses_are_field_errors() {
        let store = Users::default();
        let verifier = EmailVerifier::new(b"secret");
        let outbox = Outbox::default();
        register_user(&store, &verifier, &outbox, &form("ann", "ann@example.com"), Utc::now())
            .await
            .unwrap();

        let err = register_user(&store, &verifier, &outbox, &form("ann", "ANN@example.com"), Utc::now())
            .await
            .unwrap_err();
        let AccountError::Invalid(fields) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert!(fields.get("username").is_some());
        assert!(fields.get("email").is_some());
    }

    #[tokio::test]
    async fn malformed_forms_never_reach_the_store() {
        let store = Users::default();
        let verifier = EmailVerifier::new(b"secret");
        let outbox = Outbox::default();

        let err = register_user(&store, &verifier, &outbox, &form("ann lee!", "nope"), Utc::now())
            .await
            .unwrap_err();
        let AccountError::Invalid(fields) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert_eq!(fields.fields().collect::<Vec<_>>(), vec!["email", "username"]);
        assert!(store.0.lock().unwrap().is_empty());
        assert!(outbox.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failures_are_reported() {
        let store = Users::default();
        let verifier = EmailVerifier::new(b"secret");
        let err = register_user(&store, &verifier, &Offline, &form("ann", "ann@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Delivery(_)));
    }

    #[tokio::test]
    async fn bad_expired_and_stale_links_are_rejected() {
        let store = Users::default();
        let verifier = EmailVerifier::new(b"secret");
        let outbox = Outbox::default();
        let now = Utc::now();
        let reg = register_user(&store, &verifier, &outbox, &form("ann", "ann@example.com"), now)
            .await
            .unwrap();
        let token = outbox.0.lock().unwrap()[0].clone();

        assert!(matches!(
            verify_email(&store, &verifier, "not-a-token", now).await,
            Err(AccountError::InvalidToken)
        ));
        assert!(matches!(
            verify_email(&store, &verifier, &token, now + Duration::hours(25)).await,
            Err(AccountError::InvalidToken)
        ));
        let unknown = verifier.issue(UserId::new(), "ann@example.com", now).unwrap();
        assert!(matches!(
            verify_email(&store, &verifier, &unknown, now).await,
            Err(AccountError::InvalidToken)
        ));

        let mut user = store.get(reg.user_id).await.unwrap();
        user.email = Email::parse("other@example.com").unwrap();
        store.save_profile(&user).await.unwrap();
        assert!(matches!(
            verify_email(&store, &verifier, &token, now).await,
            Err(AccountError::InvalidToken)
        ));
        assert!(!store.get(reg.user_id).await.unwrap().is_active);
    }

    #[test]
    fn link_joins_base_and_token() {
        let notifier = LogNotifier::new("https://admin.example.com/");
        assert_eq!(notifier.link("abc"), "https://admin.example.com/accounts/verify/abc");
    }
}
