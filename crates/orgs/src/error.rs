//! Coded service results.
//!
//! A service either returns its value or at least one [`ServiceError`];
//! [`ServiceErrors`] cannot be constructed empty.

use serde::{Serialize, Serializer};
use thiserror::Error;

use orgdesk_core::{FieldErrors, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    InvalidRole,
    AlreadyMember,
    NotFound,
    LastAdminForbidden,
    InvalidFormat,
    EmailRequired,
    OrganizationRequired,
    ValidationError,
    SetupComplete,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::InvalidRole => "invalid_role",
            Self::AlreadyMember => "already_member",
            Self::NotFound => "not_found",
            Self::LastAdminForbidden => "last_admin_forbidden",
            Self::InvalidFormat => "invalid_format",
            Self::EmailRequired => "email_required",
            Self::OrganizationRequired => "organization_required",
            Self::ValidationError => "validation_error",
            Self::SetupComplete => "setup_complete",
            Self::Internal => "internal",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Non-empty list of service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", .first.code, .first.message)]
pub struct ServiceErrors {
    first: ServiceError,
    rest: Vec<ServiceError>,
}

pub type ServiceResult<T> = Result<T, ServiceErrors>;

impl ServiceErrors {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError::new(code, message).into()
    }

    pub fn push(&mut self, error: ServiceError) {
        self.rest.push(error);
    }

    /// Code of the first error; decides the transport status.
    pub fn code(&self) -> ErrorCode {
        self.first.code
    }

    pub fn first(&self) -> &ServiceError {
        &self.first
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceError> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Field errors as `validation_error` entries; `None` when there are none.
    pub fn from_fields(errors: &FieldErrors) -> Option<Self> {
        let mut out: Option<Self> = None;
        for field in errors.fields() {
            for message in errors.get(field).unwrap_or_default() {
                let error = ServiceError::new(ErrorCode::ValidationError, message.clone()).on_field(field);
                match out.as_mut() {
                    Some(list) => list.push(error),
                    None => out = Some(error.into()),
                }
            }
        }
        out
    }
}

impl From<ServiceError> for ServiceErrors {
    fn from(first: ServiceError) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }
}

impl From<StoreError> for ServiceErrors {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::new(ErrorCode::NotFound, format!("{what} not found")),
            other => {
                tracing::error!(error = %other, "store failure");
                Self::new(ErrorCode::Internal, "internal error")
            }
        }
    }
}

impl Serialize for ServiceErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_snake_case() {
        let err = ServiceErrors::new(ErrorCode::LastAdminForbidden, "keep one admin");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json[0]["code"], "last_admin_forbidden");
        assert!(json[0].get("field").is_none());
        assert_eq!(err.to_string(), "last_admin_forbidden: keep one admin");
    }

    #[test]
    fn field_errors_become_validation_errors() {
        let mut fields = FieldErrors::new();
        fields.add("site_name", "this field is required");
        fields.add("primary_color", "use #RRGGBB");
        let errors = ServiceErrors::from_fields(&fields).unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == ErrorCode::ValidationError));
        assert_eq!(errors.first().field.as_deref(), Some("primary_color"));
        assert!(ServiceErrors::from_fields(&FieldErrors::new()).is_none());
    }

    #[test]
    fn missing_records_map_to_not_found() {
        let errors: ServiceErrors = StoreError::NotFound("membership").into();
        assert_eq!(errors.code(), ErrorCode::NotFound);
    }
}
