//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Persistence concerns
/// belong to `StoreError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A single input field failed validation.
    ///
    /// `field` names the form field the message belongs to so callers can
    /// surface it next to the offending input.
    #[error("{field}: {message}")]
    InvalidField { field: &'static str, message: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_field(field: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: msg.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The field this error is scoped to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }

    /// The message without the field prefix.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidField { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
