//! Alert intake.
//!
//! Boundary adapter between the outside world and the per-spirit
//! controllers. Alerts and service requests for one spirit are queued to that
//! spirit's task in submission order; different spirits run independently.
//! Controllers are created on first reference.

use std::sync::Arc;

use dashmap::DashMap;
use ghostpaw_types::{
    HealthAlert, LifecycleEvent, LifecycleEventEnvelope, OperatorResponse, RemediationAction,
    ServiceAction, SpiritId, SpiritRecord, SpiritState,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::classifier::AlertClassifier;
use crate::config::LifecycleConfig;
use crate::controller::{SpiritCommand, SpiritLifecycleController};
use crate::error::{HealthError, HealthResult};
use crate::ports::{HealthAlertFeed, LifecyclePorts, OperatorPrompt};
use crate::prompts::PendingPrompts;

/// Handle to a running spirit controller.
struct SpiritHandle {
    commands: mpsc::UnboundedSender<SpiritCommand>,
    record: watch::Receiver<SpiritRecord>,
    /// Taken by whoever waits for the task to exit.
    task: Option<JoinHandle<()>>,
    /// Flips to `true` (or closes) once the task has exited.
    done: watch::Receiver<bool>,
    /// Decommission queued; new work goes to a successor controller.
    draining: bool,
}

/// Wait until a controller task has exited.
async fn exited(mut done: watch::Receiver<bool>) {
    // A closed channel means the task is gone as well.
    let _ = done.wait_for(|exited| *exited).await;
}

/// Entry point for alerts, operator responses and service requests.
///
/// Must be used from within a Tokio runtime: controllers are spawned lazily.
pub struct AlertIntake {
    config: LifecycleConfig,
    ports: LifecyclePorts,
    prompt: Arc<dyn OperatorPrompt>,
    prompts: PendingPrompts,
    classifier: AlertClassifier,
    spirits: DashMap<SpiritId, SpiritHandle>,
    event_tx: broadcast::Sender<LifecycleEventEnvelope>,
}

impl AlertIntake {
    /// Create an intake. Escalations are answered through
    /// [`AlertIntake::submit_operator_response`] unless the ports carry
    /// their own operator prompt.
    pub fn new(config: LifecycleConfig, ports: LifecyclePorts) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let prompts = PendingPrompts::new();
        let prompt: Arc<dyn OperatorPrompt> = match &ports.prompt {
            Some(prompt) => prompt.clone(),
            None => Arc::new(prompts.clone()),
        };

        Self {
            config,
            ports,
            prompt,
            prompts,
            classifier: AlertClassifier::new(),
            spirits: DashMap::new(),
            event_tx,
        }
    }

    /// Subscribe to lifecycle events from every spirit.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEventEnvelope> {
        self.event_tx.subscribe()
    }

    pub fn classifier(&self) -> &AlertClassifier {
        &self.classifier
    }

    /// Queue an alert for its spirit.
    #[instrument(skip(self, alert), fields(spirit_id = %alert.spirit_id, alert_id = %alert.id))]
    pub fn submit_alert(&self, alert: HealthAlert) -> HealthResult<()> {
        let spirit_id = alert.spirit_id.clone();
        debug!("Alert received");

        // Registered before queueing so an answer can arrive ahead of the prompt.
        let escalates = self.ports.prompt.is_none()
            && self.classifier.classify(&alert).action == RemediationAction::Escalate;
        if escalates {
            self.prompts.expect(&alert);
        }

        let alert_id = alert.id.clone();
        let routed = self.route(&spirit_id, SpiritCommand::Alert(alert));
        if routed.is_err() && escalates {
            self.prompts.release(&alert_id);
        }
        routed
    }

    /// Pull every alert from a feed and submit them in feed order.
    pub async fn drain_feed(&self, feed: &dyn HealthAlertFeed) -> HealthResult<usize> {
        let alerts = feed.get_health_alerts().await?;
        let count = alerts.len();
        for alert in alerts {
            self.submit_alert(alert)?;
        }
        Ok(count)
    }

    /// Deliver an operator answer for an escalated alert.
    ///
    /// An answer may arrive before the spirit's task opens the prompt, for
    /// example while the alert is still deferred; it is held until then.
    /// Returns `false` when no escalation is outstanding for that alert id
    /// (already finished, or never escalated).
    pub fn submit_operator_response(&self, response: OperatorResponse) -> bool {
        let decision = response.decision();
        let delivered = self.prompts.respond(&response.alert_id, decision);
        if !delivered {
            warn!(
                alert_id = %response.alert_id,
                "Operator response for an alert with no outstanding escalation"
            );
        }
        delivered
    }

    /// Registry of prompts waiting on an operator.
    pub fn pending_prompts(&self) -> &PendingPrompts {
        &self.prompts
    }

    /// Run a service action on a spirit, serialized with its alert handling.
    #[instrument(skip(self))]
    pub async fn manage_service(
        &self,
        spirit_id: &SpiritId,
        action: ServiceAction,
        requested_by: &str,
    ) -> HealthResult<()> {
        let (reply, result) = oneshot::channel();
        self.route(
            spirit_id,
            SpiritCommand::Manage {
                action,
                requested_by: requested_by.to_string(),
                reply,
            },
        )?;

        result
            .await
            .map_err(|_| HealthError::IntakeClosed(spirit_id.clone()))?
    }

    /// Current lifecycle state, `None` for a spirit never seen.
    pub fn get_spirit_state(&self, spirit_id: &SpiritId) -> Option<SpiritState> {
        self.spirits
            .get(spirit_id)
            .map(|handle| handle.record.borrow().state)
    }

    pub fn get_spirit_record(&self, spirit_id: &SpiritId) -> Option<SpiritRecord> {
        self.spirits
            .get(spirit_id)
            .map(|handle| handle.record.borrow().clone())
    }

    /// Records of every tracked spirit.
    pub fn spirits(&self) -> Vec<SpiritRecord> {
        self.spirits
            .iter()
            .map(|handle| handle.record.borrow().clone())
            .collect()
    }

    /// Watch a spirit's record for changes.
    pub fn watch_spirit(&self, spirit_id: &SpiritId) -> Option<watch::Receiver<SpiritRecord>> {
        self.spirits.get(spirit_id).map(|handle| handle.record.clone())
    }

    /// Drop a spirit after its queued work finishes.
    ///
    /// Waits for the spirit's task to exit. The spirit stays registered until
    /// then; work submitted meanwhile goes to a fresh controller that starts
    /// only once the old task has exited.
    #[instrument(skip(self))]
    pub async fn decommission(&self, spirit_id: &SpiritId) -> HealthResult<()> {
        let (task, done) = {
            let mut handle = self
                .spirits
                .get_mut(spirit_id)
                .ok_or_else(|| HealthError::SpiritNotFound(spirit_id.clone()))?;

            if !handle.draining {
                info!(spirit_id = %spirit_id, "Decommissioning spirit");
                handle.draining = true;
                if handle.commands.send(SpiritCommand::Decommission).is_err() {
                    debug!(spirit_id = %spirit_id, "Spirit task already stopped");
                }
            }
            (handle.task.take(), handle.done.clone())
        };

        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    warn!(spirit_id = %spirit_id, error = %e, "Spirit task ended abnormally");
                }
            }
            None => exited(done).await,
        }

        // A successor spawned while draining keeps its entry.
        self.spirits.remove_if(spirit_id, |_, handle| handle.draining);
        Ok(())
    }

    /// Close every queue and wait for all queued work to finish.
    pub async fn shutdown(&self) {
        let spirit_ids: Vec<SpiritId> = self.spirits.iter().map(|r| r.key().clone()).collect();
        info!(spirits = spirit_ids.len(), "Shutting down alert intake");

        for spirit_id in spirit_ids {
            if let Some((_, handle)) = self.spirits.remove(&spirit_id) {
                drop(handle.commands);
                match handle.task {
                    Some(task) => {
                        if let Err(e) = task.await {
                            warn!(spirit_id = %spirit_id, error = %e, "Spirit task ended abnormally");
                        }
                    }
                    None => exited(handle.done).await,
                }
            }
        }
    }

    fn route(&self, spirit_id: &SpiritId, command: SpiritCommand) -> HealthResult<()> {
        let mut handle = self
            .spirits
            .entry(spirit_id.clone())
            .or_insert_with(|| self.spawn_spirit(spirit_id.clone(), None));

        if handle.draining {
            debug!(spirit_id = %spirit_id, "Spirit is being decommissioned, queueing behind it");
            let predecessor = handle.done.clone();
            *handle = self.spawn_spirit(spirit_id.clone(), Some(predecessor));
        } else if handle.commands.is_closed() {
            warn!(spirit_id = %spirit_id, "Spirit task stopped unexpectedly, restarting controller");
            *handle = self.spawn_spirit(spirit_id.clone(), None);
        }

        handle
            .commands
            .send(command)
            .map_err(|_| HealthError::IntakeClosed(spirit_id.clone()))
    }

    /// Spawn a controller. With a `predecessor`, it starts handling work only
    /// after that task has exited.
    fn spawn_spirit(
        &self,
        spirit_id: SpiritId,
        predecessor: Option<watch::Receiver<bool>>,
    ) -> SpiritHandle {
        info!(spirit_id = %spirit_id, "Tracking new spirit");

        let (controller, record) = SpiritLifecycleController::new(
            spirit_id.clone(),
            self.classifier,
            self.ports.service.clone(),
            self.ports.log.clone(),
            self.ports.notifier.clone(),
            self.ports.acknowledger.clone(),
            self.prompt.clone(),
            self.config.prompt_timeout(),
            self.event_tx.clone(),
        );

        let _ = self.event_tx.send(LifecycleEventEnvelope::new(
            spirit_id,
            LifecycleEvent::SpiritDiscovered,
        ));

        let (commands, receiver) = mpsc::unbounded_channel();
        let (done_tx, done) = watch::channel(false);
        let task = tokio::spawn(async move {
            if let Some(predecessor) = predecessor {
                exited(predecessor).await;
            }
            controller.run(receiver).await;
            let _ = done_tx.send(true);
        });

        SpiritHandle {
            commands,
            record,
            task: Some(task),
            done,
            draining: false,
        }
    }
}

impl Drop for AlertIntake {
    fn drop(&mut self) {
        // Dropping the senders lets each task finish its queue and exit.
        self.spirits.clear();
    }
}
