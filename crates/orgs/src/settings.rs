//! Site-wide settings singleton.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orgdesk_core::{Email, FieldErrors, HexColor, StoreError, StoreResult};
use orgdesk_crud::{ConfigError, CrudConfig, CrudError, RequestContext};

pub const SETTINGS_SLUG: &str = "admin.settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub welcome_message: String,
    pub primary_color: HexColor,
    pub secondary_color: HexColor,
    pub company_address: String,
    pub company_phone: String,
    pub company_email: Option<Email>,
    pub navbar_fixed: bool,
    pub sidebar_collapsed: bool,
    pub setup_complete: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Admin Dashboard".to_string(),
            welcome_message: "Welcome to your platform".to_string(),
            primary_color: HexColor::rgb(0x69, 0x6c, 0xff),
            secondary_color: HexColor::rgb(0x85, 0x92, 0xa3),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: None,
            navbar_fixed: true,
            sidebar_collapsed: false,
            setup_complete: false,
        }
    }
}

/// Singleton persistence port. `load` yields defaults until first saved.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> StoreResult<SiteSettings>;

    async fn save(&self, settings: &SiteSettings) -> StoreResult<()>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
    #[serde(default)]
    pub company_address: String,
    #[serde(default)]
    pub company_phone: String,
    #[serde(default)]
    pub company_email: String,
    #[serde(default)]
    pub navbar_fixed: bool,
    #[serde(default)]
    pub sidebar_collapsed: bool,
}

impl SettingsForm {
    pub const MAX_SITE_NAME: usize = 100;
    pub const MAX_PHONE: usize = 50;

    /// Validate into `errors`; the returned settings keep `current.setup_complete`.
    pub fn validate_into(&self, current: &SiteSettings, errors: &mut FieldErrors) -> Option<SiteSettings> {
        let site_name = self.site_name.trim().to_string();
        if site_name.is_empty() {
            errors.add("site_name", "this field is required");
        } else if site_name.chars().count() > Self::MAX_SITE_NAME {
            errors.add(
                "site_name",
                format!("ensure this value has at most {} characters", Self::MAX_SITE_NAME),
            );
        }
        if self.company_phone.trim().chars().count() > Self::MAX_PHONE {
            errors.add(
                "company_phone",
                format!("ensure this value has at most {} characters", Self::MAX_PHONE),
            );
        }

        let primary = errors.check("primary_color", HexColor::parse(&self.primary_color));
        let secondary = errors.check("secondary_color", HexColor::parse(&self.secondary_color));
        let company_email = if self.company_email.trim().is_empty() {
            Some(None)
        } else {
            errors.check("company_email", Email::parse(&self.company_email)).map(Some)
        };

        if !errors.is_empty() {
            return None;
        }
        Some(SiteSettings {
            site_name,
            welcome_message: self.welcome_message.trim().to_string(),
            primary_color: primary?,
            secondary_color: secondary?,
            company_address: self.company_address.trim().to_string(),
            company_phone: self.company_phone.trim().to_string(),
            company_email: company_email?,
            navbar_fixed: self.navbar_fixed,
            sidebar_collapsed: self.sidebar_collapsed,
            setup_complete: current.setup_complete,
        })
    }

    pub fn validate(&self, current: &SiteSettings) -> Result<SiteSettings, FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.validate_into(current, &mut errors) {
            Some(settings) => Ok(settings),
            None => Err(errors),
        }
    }
}

/// The settings "listing": a single record, no columns, no export.
pub fn settings_config() -> Result<CrudConfig, ConfigError> {
    CrudConfig::builder(SETTINGS_SLUG)
        .labels("Setting", "Settings")
        .page_title("Site settings")
        .page_size(1)
        .permissions("settings.view", "settings.change", "settings.change", "settings.delete")
        .disable_export()
        .build()
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Denied(#[from] CrudError),

    #[error(transparent)]
    Invalid(#[from] FieldErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn get_settings(
    config: &CrudConfig,
    store: &dyn SettingsStore,
    ctx: &RequestContext,
) -> Result<SiteSettings, SettingsError> {
    config.permissions.list.check(ctx)?;
    Ok(store.load().await?)
}

pub async fn update_settings(
    config: &CrudConfig,
    store: &dyn SettingsStore,
    ctx: &RequestContext,
    form: &SettingsForm,
) -> Result<SiteSettings, SettingsError> {
    config.permissions.edit.check(ctx)?;
    let current = store.load().await?;
    let next = form.validate(&current)?;
    store.save(&next).await?;
    tracing::info!(site_name = %next.site_name, "site settings updated");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SettingsForm {
        SettingsForm {
            site_name: "Acme".into(),
            primary_color: "#AABBCC".into(),
            secondary_color: "#000000".into(),
            ..SettingsForm::default()
        }
    }

    #[test]
    fn valid_form_keeps_setup_flag() {
        let current = SiteSettings {
            setup_complete: true,
            ..SiteSettings::default()
        };
        let next = form().validate(&current).unwrap();
        assert!(next.setup_complete);
        assert_eq!(next.primary_color.as_str(), "#aabbcc");
        assert_eq!(next.company_email, None);
    }

    #[test]
    fn every_bad_field_is_reported() {
        let bad = SettingsForm {
            site_name: " ".into(),
            primary_color: "blue".into(),
            company_email: "nope".into(),
            ..form()
        };
        let errors = bad.validate(&SiteSettings::default()).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["company_email", "primary_color", "site_name"]
        );
    }

    #[test]
    fn settings_listing_has_no_export() {
        let config = settings_config().unwrap();
        assert!(!config.export.enabled);
        assert_eq!(config.page_size, 1);
        assert!(config.columns.is_empty());
    }
}
