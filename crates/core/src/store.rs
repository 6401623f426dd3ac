//! Persistence failure shared by every store port.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(e: impl core::fmt::Display) -> Self {
        Self::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
