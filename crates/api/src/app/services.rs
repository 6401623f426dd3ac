//! Backend wiring: store ports, listing sources and the listing registry.

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use orgdesk_accounts::{LogNotifier, USERS_SLUG, UserStore, VerificationNotifier, users_config};
use orgdesk_auth::{EmailVerifier, Hs256Jwt};
use orgdesk_catalog::{ITEMS_SLUG, ItemStore, items_config};
use orgdesk_crud::{ConfigError, CrudConfig, CrudRegistry, Listing, RecordSource, RegistryError};
use orgdesk_infra::{
    MemoryBackend, PgItemStore, PgOrgStore, PgRecordSource, PgRelation, PgSettingsStore,
    PgUserStore,
};
use orgdesk_orgs::{MembershipStore, SettingsStore, settings_config};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WiringError {
    #[error(transparent)]
    Descriptor(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

/// Everything a handler needs, shared behind one `Arc`.
pub struct AppServices {
    pub jwt: Arc<Hs256Jwt>,
    pub token_ttl: Duration,
    pub verifier: Arc<EmailVerifier>,
    pub notifier: Arc<dyn VerificationNotifier>,
    pub export_chunk_size: u64,
    pub registry: CrudRegistry,
    pub settings_config: CrudConfig,
    pub items: Arc<dyn ItemStore>,
    pub users: Arc<dyn UserStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub members: Arc<dyn RecordSource>,
}

/// Storage handed to [`AppServices::new`].
pub struct Backend {
    pub items: Arc<dyn ItemStore>,
    pub item_rows: Arc<dyn RecordSource>,
    pub users: Arc<dyn UserStore>,
    pub user_rows: Arc<dyn RecordSource>,
    pub memberships: Arc<dyn MembershipStore>,
    pub member_rows: Arc<dyn RecordSource>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Backend {
    pub fn memory(backend: MemoryBackend) -> Self {
        let shared = Arc::new(backend);
        Self {
            item_rows: Arc::new(shared.item_rows()),
            user_rows: Arc::new(shared.user_rows()),
            member_rows: Arc::new(shared.member_rows()),
            items: shared.clone(),
            users: shared.clone(),
            memberships: shared.clone(),
            settings: shared,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let pool = Arc::new(pool);
        Self {
            items: Arc::new(PgItemStore::new(pool.clone())),
            item_rows: Arc::new(PgRecordSource::new(pool.clone(), PgRelation::items())),
            users: Arc::new(PgUserStore::new(pool.clone())),
            user_rows: Arc::new(PgRecordSource::new(pool.clone(), PgRelation::users())),
            memberships: Arc::new(PgOrgStore::new(pool.clone())),
            member_rows: Arc::new(PgRecordSource::new(pool.clone(), PgRelation::members())),
            settings: Arc::new(PgSettingsStore::new(pool)),
        }
    }
}

impl AppServices {
    pub fn new(
        backend: Backend,
        jwt_secret: &str,
        token_ttl_minutes: i64,
        export_chunk_size: u64,
    ) -> Result<Self, WiringError> {
        let mut registry = CrudRegistry::new();
        registry.register(items_config()?, backend.item_rows)?;
        registry.register(users_config()?, backend.user_rows)?;

        Ok(Self {
            jwt: Arc::new(Hs256Jwt::new(jwt_secret.as_bytes())),
            token_ttl: Duration::minutes(token_ttl_minutes),
            verifier: Arc::new(EmailVerifier::new(jwt_secret.as_bytes())),
            notifier: Arc::new(LogNotifier::new(DEFAULT_PUBLIC_URL)),
            export_chunk_size,
            registry,
            settings_config: settings_config()?,
            items: backend.items,
            users: backend.users,
            memberships: backend.memberships,
            settings: backend.settings,
            members: backend.member_rows,
        })
    }

    /// Replace where verification links go (the log, by default).
    pub fn with_notifier(mut self, notifier: Arc<dyn VerificationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn listing(&self, slug: &str) -> Result<&Listing, RegistryError> {
        self.registry.get(slug)
    }

    pub fn items_listing(&self) -> Result<&Listing, RegistryError> {
        self.listing(ITEMS_SLUG)
    }

    pub fn users_listing(&self) -> Result<&Listing, RegistryError> {
        self.listing(USERS_SLUG)
    }
}
