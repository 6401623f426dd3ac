use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use orgdesk_core::{StoreError, StoreResult};
use orgdesk_orgs::{SettingsStore, SiteSettings};

use super::map_sqlx_error;

/// Seeds the singleton row with defaults so there is always a row to lock.
pub(super) const SEED_SETTINGS: &str =
    "INSERT INTO site_settings (id, data, updated_at) VALUES (1, $1, now()) ON CONFLICT (id) DO NOTHING";

pub(super) const LOCK_SETTINGS: &str = "SELECT data FROM site_settings WHERE id = 1 FOR UPDATE";

pub(super) fn settings_from_json(data: Option<Json<serde_json::Value>>) -> StoreResult<SiteSettings> {
    match data {
        Some(Json(value)) => serde_json::from_value(value)
            .map_err(|e| StoreError::Backend(format!("corrupt site settings: {e}"))),
        None => Ok(SiteSettings::default()),
    }
}

pub(super) async fn upsert_settings<'e>(executor: impl PgExecutor<'e>, settings: &SiteSettings) -> StoreResult<()> {
    let data = serde_json::to_value(settings).map_err(StoreError::backend)?;
    sqlx::query(
        "INSERT INTO site_settings (id, data, updated_at) VALUES (1, $1, now()) \
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
    )
    .bind(Json(data))
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("save_settings", e))?;
    Ok(())
}

/// The settings singleton, stored as one JSONB document in row `id = 1`.
pub struct PgSettingsStore {
    pool: Arc<PgPool>,
}

impl PgSettingsStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    #[instrument(skip(self), err)]
    async fn load(&self) -> StoreResult<SiteSettings> {
        let data: Option<Json<serde_json::Value>> =
            sqlx::query_scalar("SELECT data FROM site_settings WHERE id = 1")
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("load_settings", e))?;
        settings_from_json(data)
    }

    #[instrument(skip(self, settings), err)]
    async fn save(&self, settings: &SiteSettings) -> StoreResult<()> {
        upsert_settings(&*self.pool, settings).await
    }
}
