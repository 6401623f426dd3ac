//! `orgdesk-crud`: declarative list engine.
//!
//! A [`CrudConfig`] describes one listing (columns, filters, search fields,
//! default ordering, page size, permissions, export). The engine turns raw
//! query-string pairs into a [`ListQuery`], runs it against a
//! [`RecordSource`] and materializes a paginated [`ListView`] or an export.
//!
//! Storage is abstract: `memory` evaluates queries over rows in process,
//! SQL backends translate [`ListQuery`] themselves.

pub mod column;
pub mod config;
pub mod error;
pub mod export;
pub mod memory;
pub mod paginate;
pub mod params;
pub mod permission;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod source;
pub mod value;
pub mod view;

pub use column::{ColumnDef, ColumnKind, FilterDef};
pub use config::{ConfigError, CrudConfig, CrudConfigBuilder, CrudPermissions, ExportConfig, FormTitles, RowUrls, StatusOption};
pub use error::CrudError;
pub use export::{ChunkCursor, ExportFormat, ExportSpec, export_request};
pub use memory::MemorySource;
pub use paginate::{PageInfo, Paginator};
pub use params::CrudParams;
pub use permission::{PermissionSpec, RequestContext};
pub use query::{Condition, ListQuery, OrderKey, OrderTarget, SortDirection};
pub use registry::{CrudRegistry, Listing, RegistryError};
pub use source::{RecordSource, RowChunks, SourceError};
pub use value::{Row, Value};
pub use view::{ListView, build_list};
