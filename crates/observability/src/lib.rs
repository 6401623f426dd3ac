//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialise tracing with the format named by `LOG_FORMAT` (JSON by default).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
