//! Error types for ghostpawd

use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed feed input
    #[error("Feed error: {0}")]
    Feed(String),

    /// Lifecycle subsystem error
    #[error("Health error: {0}")]
    Health(#[from] ghostpaw_health::HealthError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(e: config::ConfigError) -> Self {
        DaemonError::Config(e.to_string())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
