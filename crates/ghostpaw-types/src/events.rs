//! Event types for lifecycle observability
//!
//! Events provide a unified stream of classification and remediation
//! activity for dashboards and audit.

use crate::{
    AlertId, OperatorDecision, RemediationDecision, ServiceAction, SpiritId, SpiritState,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event severity
    pub severity: EventSeverity,

    /// Spirit the event is about
    pub spirit_id: SpiritId,

    /// The actual event
    pub event: LifecycleEvent,
}

impl LifecycleEventEnvelope {
    pub fn new(spirit_id: SpiritId, event: LifecycleEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity: event.severity(),
            spirit_id,
            event,
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event
    Debug,
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

/// Lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// First alert for a previously unknown spirit
    SpiritDiscovered,

    /// Alert was classified
    AlertClassified {
        alert_id: AlertId,
        decision: RemediationDecision,
    },

    /// Alert arrived while a remediation was in flight and was queued
    AlertDeferred {
        alert_id: AlertId,
        behind: SpiritState,
    },

    /// Re-delivery of an alert id that was already accepted
    DuplicateAlertIgnored {
        alert_id: AlertId,
    },

    /// Lifecycle state transition
    StateChanged {
        from: SpiritState,
        to: SpiritState,
    },

    /// Operator was asked to decide on an escalated alert
    OperatorPrompted {
        alert_id: AlertId,
    },

    /// Operator answered, or the prompt timed out
    OperatorResponded {
        alert_id: AlertId,
        decision: OperatorDecision,
        timed_out: bool,
    },

    /// Restart finished successfully
    RestartCompleted {
        alert_id: Option<AlertId>,
    },

    /// Restart failed
    RestartFailed {
        alert_id: Option<AlertId>,
        reason: String,
    },

    /// Manual service action finished
    ServiceActionCompleted {
        action: ServiceAction,
        success: bool,
    },

    /// Spirit was decommissioned and its record dropped
    SpiritDecommissioned,
}

impl LifecycleEvent {
    pub fn severity(&self) -> EventSeverity {
        match self {
            LifecycleEvent::DuplicateAlertIgnored { .. } => EventSeverity::Debug,
            LifecycleEvent::OperatorPrompted { .. } | LifecycleEvent::AlertDeferred { .. } => {
                EventSeverity::Warning
            }
            LifecycleEvent::RestartFailed { .. } => EventSeverity::Error,
            LifecycleEvent::ServiceActionCompleted { success: false, .. } => EventSeverity::Error,
            _ => EventSeverity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_takes_event_severity() {
        let envelope = LifecycleEventEnvelope::new(
            SpiritId::new("eira"),
            LifecycleEvent::RestartFailed {
                alert_id: None,
                reason: "exit 1".into(),
            },
        );
        assert_eq!(envelope.severity, EventSeverity::Error);
    }
}
