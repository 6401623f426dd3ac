use thiserror::Error;

use crate::export::ExportError;
use crate::source::SourceError;

/// Failures of list and export requests.
///
/// Everything except `Source`/`Export` is raised before any query runs.
#[derive(Debug, Error)]
pub enum CrudError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("export is disabled for this listing")]
    ExportDisabled,

    #[error("format '{0}' is not allowed for this listing")]
    FormatNotAllowed(String),

    #[error("unknown export format '{0}'")]
    UnknownFormat(String),

    #[error("no export fields declared")]
    NoExportFields,

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl CrudError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::ExportDisabled => "export_disabled",
            Self::FormatNotAllowed(_) | Self::UnknownFormat(_) => "invalid_format",
            Self::NoExportFields => "export_misconfigured",
            Self::Export(_) => "export_failed",
            Self::Source(_) => "internal",
        }
    }
}
