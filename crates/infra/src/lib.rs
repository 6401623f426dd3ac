//! Infrastructure layer: storage backends behind the domain ports.
//!
//! Two interchangeable backends implement every store port and every
//! listing's [`RecordSource`](orgdesk_crud::RecordSource):
//!
//! - [`memory`] keeps everything in process, for tests and local runs;
//! - [`postgres`] maps the same ports onto sqlx / PostgreSQL.

pub mod memory;
pub mod postgres;

pub use memory::{ItemRows, MemberRows, MemoryBackend, UserRows};
pub use postgres::{
    PgColumn, PgItemStore, PgOrgStore, PgRecordSource, PgRelation, PgSettingsStore, PgUserStore,
    connect, migrate,
};
