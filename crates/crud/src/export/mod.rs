//! Export renderers: delimited text (streamed), spreadsheet and PDF table.
//!
//! All three consume the same composed query through a [`ChunkCursor`] and
//! the descriptor's field/header declaration. Every precondition is checked
//! by [`export_request`] before the first query runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    CrudConfig, CrudError, ListQuery, RecordSource, RequestContext, Row, RowChunks, SourceError, Value,
};

pub mod csv;
pub mod pdf;
pub mod xlsx;

pub use self::csv::CsvEncoder;
pub use self::pdf::render_pdf;
pub use self::xlsx::render_xlsx;

pub const DEFAULT_CHUNK_SIZE: u64 = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("export fields ({fields}) and headers ({headers}) differ in length")]
    LengthMismatch { fields: usize, headers: usize },

    #[error("csv encoding failed: {0}")]
    Csv(String),

    #[error("spreadsheet rendering failed: {0}")]
    Xlsx(String),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf];

    /// Case-insensitive; surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl core::str::FromStr for ExportFormat {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CrudError::UnknownFormat(s.trim().to_string()))
    }
}

impl core::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Field list plus matching header list. Equal length by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    fields: Vec<String>,
    headers: Vec<String>,
}

impl ExportSpec {
    pub fn new(fields: Vec<String>, headers: Vec<String>) -> Result<Self, ExportError> {
        if fields.len() != headers.len() {
            return Err(ExportError::LengthMismatch {
                fields: fields.len(),
                headers: headers.len(),
            });
        }
        Ok(Self { fields, headers })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Values of the exported fields, in order.
    pub fn project(&self, row: &Row) -> Vec<Value> {
        self.fields.iter().map(|f| row.get(f).clone()).collect()
    }
}

/// Plain-text cell rendering shared by the CSV and PDF renderers.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Timestamp(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.to_text(),
    }
}

/// `"{base}_{YYYY-mm-dd_HH-MM-SS}.{ext}"` with unsafe characters replaced by `_`.
pub fn export_filename(base: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    let safe: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "export".to_string() } else { safe };
    format!("{}_{}.{}", safe, now.format("%Y-%m-%d_%H-%M-%S"), format.extension())
}

/// Validate an export request against a descriptor, without touching storage.
///
/// Order: list permission, enabled flag, format recognised, format allowed,
/// fields declared, field/header lengths.
pub fn export_request(
    config: &CrudConfig,
    ctx: &RequestContext,
    raw_format: &str,
) -> Result<(ExportFormat, ExportSpec), CrudError> {
    config.permissions.list.check(ctx)?;

    if !config.export.enabled {
        return Err(CrudError::ExportDisabled);
    }
    let format: ExportFormat = raw_format.parse()?;
    if !config.export.allows(format) {
        return Err(CrudError::FormatNotAllowed(format.to_string()));
    }
    if config.export.fields.is_empty() {
        return Err(CrudError::NoExportFields);
    }

    let fields = config.export.fields.iter().map(|f| f.to_string()).collect();
    let spec = ExportSpec::new(fields, config.export.headers_in_order())?;
    Ok((format, spec))
}

/// Walks an ordered query in fixed-size chunks.
///
/// The source is read lazily, on the first [`ChunkCursor::next_chunk`], and
/// through [`RecordSource::chunks`]: every chunk comes from that one read.
pub struct ChunkCursor {
    source: Arc<dyn RecordSource>,
    query: ListQuery,
    chunk_size: u64,
    chunks: Option<Box<dyn RowChunks>>,
}

impl ChunkCursor {
    pub fn new(source: Arc<dyn RecordSource>, query: ListQuery, chunk_size: u64) -> Self {
        Self {
            source,
            query,
            chunk_size: chunk_size.max(1),
            chunks: None,
        }
    }

    /// Next chunk, or `None` once the result set is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<Row>>, SourceError> {
        if self.chunks.is_none() {
            let opened = self.source.chunks(&self.query, self.chunk_size).await?;
            self.chunks = Some(opened);
        }
        match self.chunks.as_mut() {
            Some(chunks) => chunks.next_chunk().await,
            None => Ok(None),
        }
    }

    /// Drain the cursor into projected value rows (for non-streaming renderers).
    pub async fn collect(mut self, spec: &ExportSpec) -> Result<Vec<Vec<Value>>, SourceError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend(chunk.iter().map(|row| spec.project(row)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ListQuery, MemorySource, OrderKey, SortDirection};
    use chrono::TimeZone;
    use orgdesk_auth::{Principal, Role};
    use orgdesk_core::UserId;

    fn staff() -> RequestContext {
        RequestContext::for_principal(Principal::new(UserId::new(), vec![Role::STAFF]))
    }

    fn config() -> CrudConfig {
        CrudConfig::builder("catalog.items")
            .permissions("items.view", "", "", "")
            .export_fields(&[("name", "Name"), ("status", "Status")])
            .export_formats(&[ExportFormat::Csv, ExportFormat::Pdf])
            .build()
            .unwrap()
    }

    #[test]
    fn mismatched_lengths_fail_before_any_output() {
        let err = ExportSpec::new(vec!["a".into(), "b".into()], vec!["A".into()]).unwrap_err();
        assert_eq!(err, ExportError::LengthMismatch { fields: 2, headers: 1 });
    }

    #[test]
    fn export_request_checks_format_allow_list() {
        assert!(matches!(
            export_request(&config(), &staff(), "xlsx"),
            Err(CrudError::FormatNotAllowed(f)) if f == "xlsx"
        ));
        assert!(matches!(
            export_request(&config(), &staff(), "docx"),
            Err(CrudError::UnknownFormat(_))
        ));
        let (format, spec) = export_request(&config(), &staff(), " CSV ").unwrap();
        assert_eq!(format, ExportFormat::Csv);
        assert_eq!(spec.headers(), &["Name".to_string(), "Status".to_string()]);
    }

    #[test]
    fn export_request_rejects_disabled_export_and_missing_permission() {
        let disabled = CrudConfig::builder("admin.settings").build().unwrap();
        assert!(matches!(export_request(&disabled, &staff(), "csv"), Err(CrudError::ExportDisabled)));
        assert!(matches!(
            export_request(&config(), &RequestContext::anonymous(), "csv"),
            Err(CrudError::Unauthenticated)
        ));
    }

    #[test]
    fn filenames_are_sanitised_and_timestamped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            export_filename("members acme/eu", ExportFormat::Xlsx, now),
            "members_acme_eu_2024-03-09_14-05-07.xlsx"
        );
        assert_eq!(
            export_filename("", ExportFormat::Csv, now),
            "export_2024-03-09_14-05-07.csv"
        );
    }

    #[tokio::test]
    async fn cursor_walks_every_row_once_in_order() {
        let rows: Vec<Row> = (0..7i64).map(|i| Row::new(i).with("name", format!("n{i}"))).collect();
        let source: Arc<dyn RecordSource> = Arc::new(MemorySource::new(rows));
        let query = ListQuery::new().order_by(vec![OrderKey::pk(SortDirection::Desc)]);

        let mut cursor = ChunkCursor::new(source, query, 3);
        let mut sizes = Vec::new();
        let mut pks = Vec::new();
        while let Some(chunk) = cursor.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
            pks.extend(chunk.into_iter().map(|r| r.pk().clone()));
        }
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(pks.first(), Some(&Value::Int(6)));
        assert_eq!(pks.len(), 7);
    }

    /// Rows behind a lock, so a test can write between chunks.
    struct Shifting(std::sync::Mutex<Vec<Row>>);

    #[async_trait::async_trait]
    impl RecordSource for Shifting {
        async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
            Ok(self.fetch(query, 0, u64::MAX).await?.len() as u64)
        }

        async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
            let rows = self.0.lock().unwrap().clone();
            MemorySource::new(rows).fetch(query, offset, limit).await
        }
    }

    #[tokio::test]
    async fn writes_between_chunks_do_not_shift_the_export() {
        let rows: Vec<Row> = (0..6i64).map(Row::new).collect();
        let source = Arc::new(Shifting(std::sync::Mutex::new(rows)));
        let query = ListQuery::new().order_by(vec![OrderKey::pk(SortDirection::Asc)]);
        let mut cursor = ChunkCursor::new(source.clone(), query, 2);

        let mut pks: Vec<Value> = Vec::new();
        let first = cursor.next_chunk().await.unwrap().unwrap();
        pks.extend(first.into_iter().map(|r| r.pk().clone()));

        // A row ahead of the cursor disappears and one sorts in before it.
        {
            let mut rows = source.0.lock().unwrap();
            rows.retain(|r| r.pk() != &Value::Int(4));
            rows.push(Row::new(-1i64));
        }

        while let Some(chunk) = cursor.next_chunk().await.unwrap() {
            pks.extend(chunk.into_iter().map(|r| r.pk().clone()));
        }
        let expected: Vec<Value> = (0..6i64).map(Value::Int).collect();
        assert_eq!(pks, expected);
    }
}
