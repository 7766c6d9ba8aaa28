//! Spirit lifecycle types

use crate::SpiritId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a spirit as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpiritState {
    /// No remediation in progress
    #[default]
    Idle,
    /// A restart command is in flight
    Restarting,
    /// Waiting on an operator decision for an escalated alert
    AwaitingOperator,
}

impl fmt::Display for SpiritState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiritState::Idle => write!(f, "idle"),
            SpiritState::Restarting => write!(f, "restarting"),
            SpiritState::AwaitingOperator => write!(f, "awaiting-operator"),
        }
    }
}

/// Per-spirit lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiritRecord {
    pub id: SpiritId,
    pub state: SpiritState,
    /// Idle flag from the most recent alert
    pub idle: bool,
    /// When a service action last completed or failed
    pub last_action_at: Option<DateTime<Utc>>,
}

impl SpiritRecord {
    /// A freshly discovered spirit starts out `Idle`.
    pub fn new(id: SpiritId) -> Self {
        Self {
            id,
            state: SpiritState::Idle,
            idle: false,
            last_action_at: None,
        }
    }
}

/// Service-control actions an operator may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAction::Start => write!(f, "start"),
            ServiceAction::Stop => write!(f, "stop"),
            ServiceAction::Restart => write!(f, "restart"),
        }
    }
}
