//! Health alert types
//!
//! Alerts are produced by the external health monitor and are never mutated
//! once received.

use crate::{AlertId, SpiritId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a health alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Memory usage above threshold
    Memory,
    /// CPU usage above threshold
    Cpu,
    /// Response latency above threshold
    Latency,
    /// Error rate above threshold
    ErrorRate,
    /// Anything the monitor reports that is not in the closed set above
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Memory => write!(f, "memory"),
            AlertKind::Cpu => write!(f, "cpu"),
            AlertKind::Latency => write!(f, "latency"),
            AlertKind::ErrorRate => write!(f, "error-rate"),
            AlertKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A health alert about a single spirit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    /// Unique alert id
    pub id: AlertId,

    /// Spirit the alert refers to
    pub spirit_id: SpiritId,

    /// Alert category
    pub kind: AlertKind,

    /// Measured value
    pub value: f64,

    /// Threshold the value is compared against
    pub threshold: f64,

    /// Whether the spirit was serving no active work when measured
    pub spirit_idle: bool,

    /// Human-readable description from the monitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HealthAlert {
    pub fn new(
        id: impl Into<String>,
        spirit_id: impl Into<String>,
        kind: AlertKind,
        value: f64,
        threshold: f64,
        spirit_idle: bool,
    ) -> Self {
        Self {
            id: AlertId::new(id),
            spirit_id: SpiritId::new(spirit_id),
            kind,
            value,
            threshold,
            spirit_idle,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the measured value strictly exceeds the threshold.
    pub fn exceeds_threshold(&self) -> bool {
        self.value > self.threshold
    }

    /// Short summary used in operator-facing messages.
    pub fn summary(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("{} {} over threshold {}", self.kind, self.value, self.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let kind: AlertKind = serde_json::from_str("\"error-rate\"").unwrap();
        assert_eq!(kind, AlertKind::ErrorRate);
        assert_eq!(kind.to_string(), "error-rate");
    }

    #[test]
    fn test_unrecognised_kind_maps_to_unknown() {
        let kind: AlertKind = serde_json::from_str("\"disk\"").unwrap();
        assert_eq!(kind, AlertKind::Unknown);
    }

    #[test]
    fn test_alert_deserialize() {
        let alert: HealthAlert = serde_json::from_str(
            r#"{"id":"a1","spirit_id":"eira","kind":"memory","value":90.0,"threshold":80.0,"spirit_idle":true}"#,
        )
        .unwrap();

        assert_eq!(alert.spirit_id, SpiritId::new("eira"));
        assert!(alert.exceeds_threshold());
        assert!(alert.description.is_none());
        assert_eq!(alert.summary(), "memory 90 over threshold 80");
    }

    #[test]
    fn test_equal_value_does_not_exceed() {
        let alert = HealthAlert::new("a2", "eira", AlertKind::Memory, 80.0, 80.0, true);
        assert!(!alert.exceeds_threshold());
    }
}
