//! PostgreSQL backend (sqlx 0.8).
//!
//! Each store holds an `Arc<PgPool>`. Dynamic list queries are assembled by
//! [`PgRecordSource`] through a per-listing column whitelist; everything else
//! is static SQL.

mod items;
mod orgs;
mod settings;
mod source;
mod users;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use orgdesk_core::StoreError;

pub use items::PgItemStore;
pub use orgs::PgOrgStore;
pub use settings::PgSettingsStore;
pub use source::{PgColumn, PgRecordSource, PgRelation};
pub use users::PgUserStore;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const SESSION_SETUP: &str = "SET TIME ZONE 'UTC'";

/// Open a pool against `database_url`.
///
/// Every session runs in UTC, so `timestamptz::text` (what listing search
/// matches against) does not depend on the server's default time zone.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query(SESSION_SETUP).execute(conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "postgres pool ready");
    Ok(pool)
}

/// Apply the schema. Safe to run on every start-up.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("schema applied");
    Ok(())
}

/// Map a sqlx error onto the store error model.
///
/// Unique violations (`23505`) become [`StoreError::Conflict`]; everything
/// else is a backend failure.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
