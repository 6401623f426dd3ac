//! Account activation rules and the toggle operation.

use thiserror::Error;

use orgdesk_auth::Principal;
use orgdesk_core::{FieldErrors, StoreError, UserId};
use orgdesk_crud::{CrudConfig, CrudError, RequestContext};

use crate::{User, UserStore};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("you cannot deactivate your own account")]
    SelfDeactivation,

    #[error("only superusers can deactivate superusers")]
    SuperuserProtected,

    #[error(transparent)]
    Denied(#[from] CrudError),

    #[error(transparent)]
    Invalid(#[from] FieldErrors),

    #[error("verification link is invalid or has expired")]
    InvalidToken,

    #[error("failed to sign verification link: {0}")]
    Signing(String),

    #[error("could not deliver the verification e-mail: {0}")]
    Delivery(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Nobody deactivates themself; only superusers deactivate superusers.
/// Re-activation is always allowed.
pub fn ensure_can_toggle(actor: &Principal, target: &User) -> Result<(), AccountError> {
    if !target.is_active {
        return Ok(());
    }
    if actor.principal_id == target.id {
        return Err(AccountError::SelfDeactivation);
    }
    if target.is_superuser && !actor.is_superuser() {
        return Err(AccountError::SuperuserProtected);
    }
    Ok(())
}

/// Flip a user's active flag. Requires the listing's edit permission.
pub async fn toggle_user(
    config: &CrudConfig,
    store: &dyn UserStore,
    ctx: &RequestContext,
    id: UserId,
) -> Result<User, AccountError> {
    config.permissions.edit.check(ctx)?;
    let Some(actor) = ctx.principal.as_ref() else {
        return Err(CrudError::Unauthenticated.into());
    };

    let mut user = store.get(id).await?;
    ensure_can_toggle(actor, &user)?;

    user.is_active = !user.is_active;
    store.set_active(id, user.is_active).await?;
    tracing::info!(user_id = %id, active = user.is_active, actor = %actor.principal_id, "user toggled");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use orgdesk_auth::Role;
    use orgdesk_core::Email;

    use super::*;

    fn user(superuser: bool) -> User {
        let mut u = User::invited(Email::parse("t@example.com").unwrap(), "T", "U", Utc::now());
        u.is_superuser = superuser;
        u
    }

    #[test]
    fn self_deactivation_is_refused() {
        let target = user(false);
        let actor = Principal::new(target.id, vec![Role::STAFF]);
        assert!(matches!(
            ensure_can_toggle(&actor, &target),
            Err(AccountError::SelfDeactivation)
        ));
    }

    #[test]
    fn staff_cannot_deactivate_superusers() {
        let staff = Principal::new(UserId::new(), vec![Role::STAFF]);
        let root = Principal::new(UserId::new(), vec![Role::SUPERUSER]);
        let target = user(true);
        assert!(matches!(
            ensure_can_toggle(&staff, &target),
            Err(AccountError::SuperuserProtected)
        ));
        assert!(ensure_can_toggle(&root, &target).is_ok());
    }

    #[test]
    fn reactivation_is_unrestricted() {
        let mut target = user(true);
        target.is_active = false;
        let actor = Principal::new(target.id, vec![]);
        assert!(ensure_can_toggle(&actor, &target).is_ok());
    }
}
