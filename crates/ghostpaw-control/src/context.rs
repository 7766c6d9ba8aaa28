//! Request context for control plane operations
//!
//! The request context carries who is making a request and the role the
//! registry already granted them. Authentication happens elsewhere; the
//! control plane only checks the role it is handed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ControlPlaneError;

/// Registry role, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access to state and styles
    Reader,
    /// May run service actions and answer prompts
    Maintainer,
    /// May also decommission spirits
    Admin,
    /// Full control
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Maintainer => "maintainer",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Whether this role includes everything `required` may do.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ControlPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "maintainer" => Ok(Role::Maintainer),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(ControlPlaneError::InvalidRequest(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}

/// Actor making a control plane request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Actor {
    /// Human operator from the dashboard
    User {
        /// User identifier
        user_id: String,
        /// Role granted by the registry
        role: Role,
    },
    /// Service account
    Service {
        /// Service identifier
        service_id: String,
        /// Role granted to the account
        role: Role,
    },
    /// Internal system operation
    System {
        /// Component name
        component: String,
    },
}

/// Context for a control plane request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID for tracing
    pub request_id: Uuid,
    /// Actor making the request
    pub actor: Actor,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Optional correlation ID for distributed tracing
    pub correlation_id: Option<String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(actor: Actor) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor,
            timestamp: chrono::Utc::now(),
            correlation_id: None,
        }
    }

    /// Set a correlation ID for distributed tracing
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Create a user context
    pub fn user(user_id: impl Into<String>, role: Role) -> Self {
        Self::new(Actor::User {
            user_id: user_id.into(),
            role,
        })
    }

    /// Create a service context
    pub fn service(service_id: impl Into<String>, role: Role) -> Self {
        Self::new(Actor::Service {
            service_id: service_id.into(),
            role,
        })
    }

    /// Create a system context for internal operations
    pub fn system(component: impl Into<String>) -> Self {
        Self::new(Actor::System {
            component: component.into(),
        })
    }

    /// Effective role of the actor. System components act as owner.
    pub fn role(&self) -> Role {
        match &self.actor {
            Actor::User { role, .. } | Actor::Service { role, .. } => *role,
            Actor::System { .. } => Role::Owner,
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role().satisfies(required)
    }

    /// Get the actor's identity string
    pub fn actor_id(&self) -> String {
        match &self.actor {
            Actor::User { user_id, .. } => format!("user:{}", user_id),
            Actor::Service { service_id, .. } => format!("service:{}", service_id),
            Actor::System { component } => format!("system:{}", component),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system("default")
    }
}
