//! The signed-in user's own profile: names and e-mail.

use serde::Deserialize;

use orgdesk_core::{Email, FieldErrors, StoreError, UserId};

use crate::registration::check_name;
use crate::{AccountError, User, UserStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    fn validate(&self) -> Result<Email, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name("first_name", &self.first_name, &mut errors);
        check_name("last_name", &self.last_name, &mut errors);
        match errors.check("email", Email::parse(&self.email)) {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(errors),
        }
    }
}

pub async fn get_profile(store: &dyn UserStore, actor: UserId) -> Result<User, AccountError> {
    Ok(store.get(actor).await?)
}

/// Flags, username and verification state are left untouched.
pub async fn update_profile(
    store: &dyn UserStore,
    actor: UserId,
    form: &ProfileForm,
) -> Result<User, AccountError> {
    let email = form.validate()?;
    let mut user = store.get(actor).await?;

    let duplicate = || FieldErrors::single("email", "a user with this e-mail already exists");
    if let Some(other) = store.find_by_email(&email).await? {
        if other.id != user.id {
            return Err(duplicate().into());
        }
    }

    user.first_name = form.first_name.trim().to_string();
    user.last_name = form.last_name.trim().to_string();
    user.email = email;
    match store.save_profile(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => return Err(duplicate().into()),
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::registration::tests::Users;

    async fn seeded(store: &Users, email: &str) -> User {
        let user = User::invited(Email::parse(email).unwrap(), "Old", "Name", Utc::now());
        store.insert(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn profile_edits_names_and_address() {
        let store = Users::default();
        let ann = seeded(&store, "ann@example.com").await;

        let form = ProfileForm {
            first_name: " Ann ".into(),
            last_name: "Lee".into(),
            email: "Ann.Lee@Example.com".into(),
        };
        let updated = update_profile(&store, ann.id, &form).await.unwrap();
        assert_eq!(updated.full_name(), "Ann Lee");
        assert_eq!(updated.email.as_str(), "ann.lee@example.com");
        assert_eq!(get_profile(&store, ann.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn keeping_your_own_address_is_not_a_duplicate() {
        let store = Users::default();
        let ann = seeded(&store, "ann@example.com").await;
        seeded(&store, "bob@example.com").await;

        let mut form = ProfileForm {
            first_name: "Ann".into(),
            last_name: String::new(),
            email: "ann@example.com".into(),
        };
        assert!(update_profile(&store, ann.id, &form).await.is_ok());

        form.email = "BOB@example.com".into();
        let err = update_profile(&store, ann.id, &form).await.unwrap_err();
        let AccountError::Invalid(fields) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert!(fields.get("email").is_some());
        assert_eq!(store.get(ann.id).await.unwrap().email.as_str(), "ann@example.com");
    }

    #[tokio::test]
    async fn blank_address_is_required() {
        let store = Users::default();
        let ann = seeded(&store, "ann@example.com").await;
        let err = update_profile(&store, ann.id, &ProfileForm::default()).await.unwrap_err();
        assert!(matches!(err, AccountError::Invalid(f) if f.get("email").is_some()));
    }
}
