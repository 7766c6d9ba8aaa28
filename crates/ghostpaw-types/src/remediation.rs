//! Remediation decisions and operator responses

use crate::AlertId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do about an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemediationAction {
    /// Restart the spirit without asking anyone
    AutoRestart,
    /// Hand the decision to a human operator
    Escalate,
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationAction::AutoRestart => write!(f, "auto-restart"),
            RemediationAction::Escalate => write!(f, "escalate"),
        }
    }
}

/// Classifier output. Derived per alert, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationDecision {
    pub action: RemediationAction,
    pub reason: String,
}

impl RemediationDecision {
    pub fn auto_restart(reason: impl Into<String>) -> Self {
        Self {
            action: RemediationAction::AutoRestart,
            reason: reason.into(),
        }
    }

    pub fn escalate(reason: impl Into<String>) -> Self {
        Self {
            action: RemediationAction::Escalate,
            reason: reason.into(),
        }
    }

    pub fn is_auto_restart(&self) -> bool {
        self.action == RemediationAction::AutoRestart
    }
}

/// Decision returned by an operator for an escalated alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorDecision {
    Restart,
    Dismiss,
}

impl OperatorDecision {
    /// Dashboard responses are free text; only `"restart"` restarts.
    pub fn from_response(response: &str) -> Self {
        if response.trim().eq_ignore_ascii_case("restart") {
            OperatorDecision::Restart
        } else {
            OperatorDecision::Dismiss
        }
    }
}

impl fmt::Display for OperatorDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorDecision::Restart => write!(f, "restart"),
            OperatorDecision::Dismiss => write!(f, "dismiss"),
        }
    }
}

/// Result of prompting an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOutcome {
    pub decision: OperatorDecision,
    pub timed_out: bool,
}

impl PromptOutcome {
    pub fn answered(decision: OperatorDecision) -> Self {
        Self {
            decision,
            timed_out: false,
        }
    }

    /// A prompt that timed out resolves to the no-restart branch.
    pub fn timed_out() -> Self {
        Self {
            decision: OperatorDecision::Dismiss,
            timed_out: true,
        }
    }
}

/// Operator response delivered by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorResponse {
    pub alert_id: AlertId,
    pub decision: String,
}

impl OperatorResponse {
    pub fn new(alert_id: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            alert_id: AlertId::new(alert_id),
            decision: decision.into(),
        }
    }

    pub fn decision(&self) -> OperatorDecision {
        OperatorDecision::from_response(&self.decision)
    }
}
