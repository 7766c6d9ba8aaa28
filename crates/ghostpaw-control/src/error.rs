//! Error types for the control plane

use ghostpaw_types::SpiritId;
use thiserror::Error;

/// Control plane error type
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Actor's role does not allow the operation
    #[error("Policy denied: {0}")]
    PolicyDenied(String),

    /// Health subsystem error
    #[error("Health error: {0}")]
    Health(#[from] ghostpaw_health::HealthError),

    /// Matrix error (invalid score, unknown mood)
    #[error("Matrix error: {0}")]
    Matrix(#[from] ghostpaw_matrix::MatrixError),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for control plane operations
pub type Result<T> = std::result::Result<T, ControlPlaneError>;

impl ControlPlaneError {
    pub fn spirit_not_found(spirit_id: &SpiritId) -> Self {
        Self::NotFound(format!("Spirit {}", spirit_id))
    }

    pub fn profile_not_found(spirit_id: &SpiritId) -> Self {
        Self::NotFound(format!("Profile for spirit {}", spirit_id))
    }
}
