//! Operation types for policy evaluation
//!
//! Every role-gated operation the control plane performs, used for the role
//! check and for audit logging.

use ghostpaw_types::{AlertId, ServiceAction, SpiritId};
use serde::{Deserialize, Serialize};

use crate::context::Role;

/// Role-gated operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlPlaneOperation {
    /// Start, stop or restart a spirit's service
    ManageService {
        spirit_id: SpiritId,
        action: ServiceAction,
    },
    /// Answer an escalation prompt
    RespondToPrompt { alert_id: AlertId },
    /// Stop tracking a spirit
    DecommissionSpirit { spirit_id: SpiritId },
    /// Register a profile or change its mood
    UpdateProfile { spirit_id: SpiritId },
}

impl ControlPlaneOperation {
    /// Lowest role allowed to perform the operation
    pub fn required_role(&self) -> Role {
        match self {
            ControlPlaneOperation::ManageService { .. }
            | ControlPlaneOperation::RespondToPrompt { .. }
            | ControlPlaneOperation::UpdateProfile { .. } => Role::Maintainer,
            ControlPlaneOperation::DecommissionSpirit { .. } => Role::Admin,
        }
    }

    /// Human-readable description for audit logs
    pub fn description(&self) -> String {
        match self {
            ControlPlaneOperation::ManageService { spirit_id, action } => {
                format!("{} service for spirit {}", action, spirit_id)
            }
            ControlPlaneOperation::RespondToPrompt { alert_id } => {
                format!("respond to prompt for alert {}", alert_id)
            }
            ControlPlaneOperation::DecommissionSpirit { spirit_id } => {
                format!("decommission spirit {}", spirit_id)
            }
            ControlPlaneOperation::UpdateProfile { spirit_id } => {
                format!("update profile for spirit {}", spirit_id)
            }
        }
    }
}
