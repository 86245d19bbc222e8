//! Error types for the monitoring core.

use mirror_types::UnknownSafetyObject;

/// Errors surfaced to callers of the [`Monitor`](crate::monitor::Monitor).
///
/// Observer delivery failures never appear here; the registry handles
/// them by dropping the observer.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The requested object class is not in the safety catalog.
    #[error("unsupported object class: {class}")]
    UnsupportedClass {
        /// The class name that was requested.
        class: String,
    },

    /// A request parameter was out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<UnknownSafetyObject> for MonitorError {
    fn from(err: UnknownSafetyObject) -> Self {
        Self::UnsupportedClass { class: err.0 }
    }
}
