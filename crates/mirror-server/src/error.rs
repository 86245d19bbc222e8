//! Error types for the service binary.
//!
//! [`AppError`] wraps every failure mode of startup and serving so that
//! `main` can propagate with `?`.

/// Top-level error for the `safety-mirror` binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: mirror_core::ConfigError,
    },

    /// The observer server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: mirror_observer::ServerError,
    },
}
