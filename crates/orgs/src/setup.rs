//! First-run setup: site settings, the superuser and the first organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_accounts::User;
use orgdesk_core::{Email, FieldErrors, OrganizationId, Slug, StoreError, UserId};

use crate::context::{run, service_span};
use crate::settings::{SettingsForm, SiteSettings};
use crate::{
    ErrorCode, Membership, MembershipRole, MembershipStore, Organization, ServiceErrors,
    ServiceResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupForm {
    #[serde(flatten)]
    pub settings: SettingsForm,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub admin_first_name: String,
    #[serde(default)]
    pub admin_last_name: String,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub organization_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupOutcome {
    pub admin_user_id: UserId,
    pub created_user: bool,
    pub organization_id: OrganizationId,
}

struct ValidSetup {
    settings: SiteSettings,
    email: Email,
    organization_name: String,
    slug: Slug,
}

impl SetupForm {
    pub const MAX_ORGANIZATION_NAME: usize = 200;

    fn validate(&self, current: &SiteSettings) -> Result<ValidSetup, FieldErrors> {
        let mut errors = FieldErrors::new();
        let settings = self.settings.validate_into(current, &mut errors);

        let email = errors.check("admin_email", Email::parse(&self.admin_email));

        let organization_name = self.organization_name.trim().to_string();
        if organization_name.is_empty() {
            errors.add("organization_name", "this field is required");
        } else if organization_name.chars().count() > Self::MAX_ORGANIZATION_NAME {
            errors.add(
                "organization_name",
                format!("ensure this value has at most {} characters", Self::MAX_ORGANIZATION_NAME),
            );
        }

        let slug = if self.organization_slug.trim().is_empty() {
            if organization_name.is_empty() {
                None
            } else {
                errors.check("organization_name", Slug::slugify(&organization_name))
            }
        } else {
            errors.check("organization_slug", Slug::parse(&self.organization_slug))
        };

        match (settings, email, slug) {
            (Some(settings), Some(email), Some(slug)) if errors.is_empty() => Ok(ValidSetup {
                settings,
                email,
                organization_name,
                slug,
            }),
            _ => Err(errors),
        }
    }
}

fn invalid(errors: &FieldErrors) -> ServiceErrors {
    ServiceErrors::from_fields(errors)
        .unwrap_or_else(|| ServiceErrors::new(ErrorCode::ValidationError, "invalid setup form"))
}

/// Complete first-run setup. Refused once settings say setup is complete.
///
/// Runs in one membership transaction that first locks the settings row, so
/// concurrent attempts queue and all but the first see `setup_complete`.
/// The superuser, organization, admin membership and settings commit
/// together.
pub async fn complete_setup(
    store: &dyn MembershipStore,
    form: &SetupForm,
    now: DateTime<Utc>,
) -> ServiceResult<SetupOutcome> {
    let span = service_span("complete_setup", None, None);
    run(span, async move {
        let mut tx = store.begin().await?;
        let current = tx.lock_settings().await?;
        if current.setup_complete {
            return Err(ServiceErrors::new(ErrorCode::SetupComplete, "setup has already been completed"));
        }
        let valid = form.validate(&current).map_err(|e| invalid(&e))?;

        let mut candidate = User::invited(
            valid.email.clone(),
            &form.admin_first_name,
            &form.admin_last_name,
            now,
        );
        candidate.is_staff = true;
        candidate.is_superuser = true;
        let (mut user, created_user) = tx.insert_user_if_absent(&candidate).await?;
        if !created_user {
            user.is_staff = true;
            user.is_superuser = true;
            user.is_active = true;
            tx.save_user(&user).await?;
        }

        let organization = Organization::new(valid.organization_name, valid.slug, now);
        tx.insert_organization(&organization).await.map_err(|e| match e {
            StoreError::Conflict(_) => {
                invalid(&FieldErrors::single("organization_slug", "an organization with this slug already exists"))
            }
            other => other.into(),
        })?;
        let membership = Membership::new(user.id, organization.id, MembershipRole::Admin, now);
        tx.insert_membership(&membership).await?;

        let mut settings = valid.settings;
        settings.setup_complete = true;
        tx.save_settings(&settings).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, organization_id = %organization.id, created_user, "setup completed");
        Ok(SetupOutcome {
            admin_user_id: user.id,
            created_user,
            organization_id: organization.id,
        })
    })
    .await
}
