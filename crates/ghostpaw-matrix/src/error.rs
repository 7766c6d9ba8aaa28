//! Error types for the relationship matrix

use thiserror::Error;

/// Matrix error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Score outside `[-100, 100]`
    #[error("Invalid relationship score {0}: must be within [-100, 100]")]
    InvalidScore(i32),

    /// Mood name not in the closed set
    #[error("Unknown mood: {0}")]
    UnknownMood(String),

    /// Tier name not in the closed set
    #[error("Unknown relationship tier: {0}")]
    UnknownTier(String),
}

/// Result type for matrix operations
pub type MatrixResult<T> = Result<T, MatrixError>;
