//! Configuration for lifecycle control

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// How long an escalated alert waits for an operator before it is dismissed
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_secs: u64,

    /// Capacity of the lifecycle event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_secs: default_prompt_timeout(),
            event_channel_capacity: default_event_capacity(),
        }
    }
}

impl LifecycleConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout_secs = timeout.as_secs().max(1);
        self
    }
}

fn default_prompt_timeout() -> u64 {
    300
}

fn default_event_capacity() -> usize {
    1024
}
