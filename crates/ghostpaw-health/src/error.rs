//! Error types for health and lifecycle control

use ghostpaw_types::{ServiceAction, SpiritId};
use thiserror::Error;

/// Health subsystem error type
#[derive(Debug, Error)]
pub enum HealthError {
    /// A service-control action failed
    #[error("Remediation failed: {0}")]
    RemediationFailed(#[from] RestartError),

    /// No controller exists for the spirit
    #[error("Spirit not found: {0}")]
    SpiritNotFound(SpiritId),

    /// The spirit's task is no longer accepting work
    #[error("Intake closed for spirit {0}")]
    IntakeClosed(SpiritId),

    /// A side-effect port reported a failure
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// The external alert feed could not be read
    #[error("Alert feed error: {0}")]
    Feed(String),
}

/// Failure of a service-control action against a spirit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Service {action} failed for spirit {spirit_id}: {reason}")]
pub struct RestartError {
    pub spirit_id: SpiritId,
    pub action: ServiceAction,
    pub reason: String,
}

impl RestartError {
    pub fn new(spirit_id: SpiritId, action: ServiceAction, reason: impl Into<String>) -> Self {
        Self {
            spirit_id,
            action,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a best-effort port (log, notify, acknowledge, prompt)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{port} port failed: {reason}")]
pub struct PortError {
    pub port: &'static str,
    pub reason: String,
}

impl PortError {
    pub fn new(port: &'static str, reason: impl Into<String>) -> Self {
        Self {
            port,
            reason: reason.into(),
        }
    }
}

/// Result type for health operations
pub type HealthResult<T> = Result<T, HealthError>;
