//! Record source abstraction.

use std::sync::Arc;

use thiserror::Error;

use crate::{ListQuery, Row};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The query referenced a field the backend does not expose.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Rows of one query handed out in order, a chunk at a time, all from a
/// single read of the source.
#[async_trait::async_trait]
pub trait RowChunks: Send {
    /// Next non-empty chunk, or `None` once the rows are exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Vec<Row>>, SourceError>;
}

/// Chunks over rows already read into memory.
pub(crate) struct BufferedChunks {
    rows: std::vec::IntoIter<Row>,
    chunk_size: usize,
}

impl BufferedChunks {
    pub(crate) fn new(rows: Vec<Row>, chunk_size: u64) -> Self {
        Self {
            rows: rows.into_iter(),
            chunk_size: usize::try_from(chunk_size.max(1)).unwrap_or(usize::MAX),
        }
    }
}

#[async_trait::async_trait]
impl RowChunks for BufferedChunks {
    async fn next_chunk(&mut self) -> Result<Option<Vec<Row>>, SourceError> {
        let chunk: Vec<Row> = self.rows.by_ref().take(self.chunk_size).collect();
        Ok(if chunk.is_empty() { None } else { Some(chunk) })
    }
}

/// Anything a listing can read rows from.
///
/// `fetch` must honour `query.ordering` exactly; pagination relies on a
/// stable order across calls.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError>;

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError>;

    /// Every row of `query` from one consistent read, in chunks of at most
    /// `chunk_size`. Writes that land while the chunks are consumed are not
    /// seen.
    ///
    /// The default reads the whole result with one `fetch`; sources that can
    /// stream a snapshot override it.
    async fn chunks(&self, query: &ListQuery, chunk_size: u64) -> Result<Box<dyn RowChunks>, SourceError> {
        let rows = self.fetch(query, 0, u64::MAX).await?;
        Ok(Box::new(BufferedChunks::new(rows, chunk_size)))
    }
}

#[async_trait::async_trait]
impl<S> RecordSource for Arc<S>
where
    S: RecordSource + ?Sized,
{
    async fn count(&self, query: &ListQuery) -> Result<u64, SourceError> {
        (**self).count(query).await
    }

    async fn fetch(&self, query: &ListQuery, offset: u64, limit: u64) -> Result<Vec<Row>, SourceError> {
        (**self).fetch(query, offset, limit).await
    }

    async fn chunks(&self, query: &ListQuery, chunk_size: u64) -> Result<Box<dyn RowChunks>, SourceError> {
        (**self).chunks(query, chunk_size).await
    }
}
