//! Side-effect ports used by the lifecycle controller.
//!
//! Every side effect goes through one of these traits so each can be
//! replaced independently. Logging, notification and acknowledgement are
//! synchronous and must not block; failures are reported by the controller
//! and never stop it.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use ghostpaw_types::{AlertId, HealthAlert, PromptOutcome, ServiceAction, SpiritId};
use tracing::{debug, info, warn};

use crate::error::{HealthResult, PortError, RestartError};

/// Service control for spirit processes.
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Restart a spirit. Completes when the restart has finished.
    async fn restart_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError>;

    async fn start_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError>;

    async fn stop_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError>;

    /// Dispatch a [`ServiceAction`] to the matching method.
    async fn execute(&self, spirit_id: &SpiritId, action: ServiceAction) -> Result<(), RestartError> {
        match action {
            ServiceAction::Start => self.start_service(spirit_id).await,
            ServiceAction::Stop => self.stop_service(spirit_id).await,
            ServiceAction::Restart => self.restart_service(spirit_id).await,
        }
    }
}

/// Audit log of actions taken.
pub trait ActivityLog: Send + Sync {
    fn log_action(&self, message: &str) -> Result<(), PortError>;
}

/// Admin-facing notifications (dashboard feed).
pub trait AdminNotifier: Send + Sync {
    fn notify_admin(&self, message: &str) -> Result<(), PortError>;
}

/// Acknowledgement back to the health monitor. Must be idempotent.
pub trait AlertAcknowledger: Send + Sync {
    fn acknowledge_alert(&self, alert_id: &AlertId) -> Result<(), PortError>;
}

/// Ask an operator what to do about an escalated alert.
///
/// The controller bounds the wait with its configured timeout, so
/// implementations may wait indefinitely.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    async fn prompt_for_action(
        &self,
        spirit_id: &SpiritId,
        alert: &HealthAlert,
    ) -> HealthResult<PromptOutcome>;

    /// Called for an escalating alert that will never be prompted for: a
    /// re-delivered id, or work dropped by a decommission.
    fn release(&self, _alert_id: &AlertId) {}
}

/// Pull-based source of health alerts.
#[async_trait]
pub trait HealthAlertFeed: Send + Sync {
    async fn get_health_alerts(&self) -> HealthResult<Vec<HealthAlert>>;
}

/// Bundle of the ports a controller needs.
///
/// The operator prompt is optional here; the intake falls back to its own
/// pending-prompt registry when none is given.
#[derive(Clone)]
pub struct LifecyclePorts {
    pub service: Arc<dyn ServiceControl>,
    pub log: Arc<dyn ActivityLog>,
    pub notifier: Arc<dyn AdminNotifier>,
    pub acknowledger: Arc<dyn AlertAcknowledger>,
    pub prompt: Option<Arc<dyn OperatorPrompt>>,
}

impl LifecyclePorts {
    pub fn new(
        service: Arc<dyn ServiceControl>,
        log: Arc<dyn ActivityLog>,
        notifier: Arc<dyn AdminNotifier>,
        acknowledger: Arc<dyn AlertAcknowledger>,
    ) -> Self {
        Self {
            service,
            log,
            notifier,
            acknowledger,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn OperatorPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Ports that only write to tracing and restart nothing.
    pub fn tracing_only() -> Self {
        Self::new(
            Arc::new(NoOpServiceControl),
            Arc::new(TracingActivityLog),
            Arc::new(TracingAdminNotifier),
            Arc::new(InMemoryAcknowledger::new()),
        )
    }
}

/// Activity log that writes to the `ghostpaw::action` tracing target.
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn log_action(&self, message: &str) -> Result<(), PortError> {
        info!(target: "ghostpaw::action", "{}", message);
        Ok(())
    }
}

/// Admin notifier that writes to the `ghostpaw::admin` tracing target.
pub struct TracingAdminNotifier;

impl AdminNotifier for TracingAdminNotifier {
    fn notify_admin(&self, message: &str) -> Result<(), PortError> {
        warn!(target: "ghostpaw::admin", "{}", message);
        Ok(())
    }
}

/// Acknowledger that remembers which alert ids it has seen.
#[derive(Default)]
pub struct InMemoryAcknowledger {
    acknowledged: DashSet<AlertId>,
}

impl InMemoryAcknowledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_acknowledged(&self, alert_id: &AlertId) -> bool {
        self.acknowledged.contains(alert_id)
    }

    pub fn len(&self) -> usize {
        self.acknowledged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acknowledged.is_empty()
    }
}

impl AlertAcknowledger for InMemoryAcknowledger {
    fn acknowledge_alert(&self, alert_id: &AlertId) -> Result<(), PortError> {
        if !self.acknowledged.insert(alert_id.clone()) {
            debug!(alert_id = %alert_id, "Alert already acknowledged");
        }
        Ok(())
    }
}

/// Service control that succeeds without doing anything.
pub struct NoOpServiceControl;

#[async_trait]
impl ServiceControl for NoOpServiceControl {
    async fn restart_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        debug!(spirit_id = %spirit_id, "No-op restart");
        Ok(())
    }

    async fn start_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        debug!(spirit_id = %spirit_id, "No-op start");
        Ok(())
    }

    async fn stop_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        debug!(spirit_id = %spirit_id, "No-op stop");
        Ok(())
    }
}
