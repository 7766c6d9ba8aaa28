//! Strongly-typed identifiers for Ghostpaw entities
//!
//! Spirit and alert ids are opaque strings assigned by external collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a spirit service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpiritId(String);

impl SpiritId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpiritId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpiritId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a health alert, used for idempotent acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AlertId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
