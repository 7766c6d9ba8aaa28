//! Per-spirit lifecycle controller.
//!
//! Each spirit gets exactly one [`SpiritLifecycleController`], run as its own
//! task and fed through an unbounded queue by the intake. The task is the only
//! writer of the spirit's [`SpiritRecord`], which is how at most one restart
//! per spirit is ever in flight.
//!
//! Work is handled strictly in arrival order. While a restart or an operator
//! prompt is outstanding the task keeps draining its queue: new alerts are
//! deduplicated and classified immediately, then parked until the current
//! remediation finishes.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ghostpaw_types::{
    AlertId, HealthAlert, LifecycleEvent, LifecycleEventEnvelope, OperatorDecision,
    PromptOutcome, RemediationAction, RemediationDecision, ServiceAction, SpiritId, SpiritRecord,
    SpiritState,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::AlertClassifier;
use crate::error::{HealthResult, RestartError};
use crate::ports::{ActivityLog, AdminNotifier, AlertAcknowledger, OperatorPrompt, ServiceControl};

/// Commands accepted by a spirit's task.
pub(crate) enum SpiritCommand {
    /// Health alert from the monitor
    Alert(HealthAlert),

    /// Operator-requested service action
    Manage {
        action: ServiceAction,
        requested_by: String,
        reply: oneshot::Sender<HealthResult<()>>,
    },

    /// Finish queued work, then stop
    Decommission,
}

/// Accepted work, already deduplicated and classified.
enum Work {
    Alert {
        alert: HealthAlert,
        decision: RemediationDecision,
    },
    Manage {
        action: ServiceAction,
        requested_by: String,
        reply: oneshot::Sender<HealthResult<()>>,
    },
    Decommission,
}

/// Who asked for a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartTrigger {
    Automatic,
    Operator,
}

/// Lifecycle state machine for a single spirit.
pub struct SpiritLifecycleController {
    record: SpiritRecord,
    record_tx: watch::Sender<SpiritRecord>,
    classifier: AlertClassifier,
    service: Arc<dyn ServiceControl>,
    log: Arc<dyn ActivityLog>,
    notifier: Arc<dyn AdminNotifier>,
    acknowledger: Arc<dyn AlertAcknowledger>,
    prompt: Arc<dyn OperatorPrompt>,
    prompt_timeout: Duration,
    event_tx: broadcast::Sender<LifecycleEventEnvelope>,
    /// Alert ids accepted so far; re-deliveries are ignored. Kept for the
    /// controller's whole life and never pruned, so a spirit that sees many
    /// distinct alerts grows it without bound until it is decommissioned.
    seen: HashSet<AlertId>,
    deferred: VecDeque<Work>,
}

impl SpiritLifecycleController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        spirit_id: SpiritId,
        classifier: AlertClassifier,
        service: Arc<dyn ServiceControl>,
        log: Arc<dyn ActivityLog>,
        notifier: Arc<dyn AdminNotifier>,
        acknowledger: Arc<dyn AlertAcknowledger>,
        prompt: Arc<dyn OperatorPrompt>,
        prompt_timeout: Duration,
        event_tx: broadcast::Sender<LifecycleEventEnvelope>,
    ) -> (Self, watch::Receiver<SpiritRecord>) {
        let record = SpiritRecord::new(spirit_id);
        let (record_tx, record_rx) = watch::channel(record.clone());

        let controller = Self {
            record,
            record_tx,
            classifier,
            service,
            log,
            notifier,
            acknowledger,
            prompt,
            prompt_timeout,
            event_tx,
            seen: HashSet::new(),
            deferred: VecDeque::new(),
        };

        (controller, record_rx)
    }

    fn spirit_id(&self) -> &SpiritId {
        &self.record.id
    }

    /// Run until the queue closes or the spirit is decommissioned.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SpiritCommand>) {
        debug!(spirit_id = %self.spirit_id(), "Spirit controller started");

        loop {
            let work = match self.deferred.pop_front() {
                Some(work) => work,
                None => match commands.recv().await {
                    Some(command) => match self.accept(command) {
                        Some(work) => work,
                        None => continue,
                    },
                    None => break,
                },
            };

            match work {
                Work::Alert { alert, decision } => {
                    self.handle_alert(alert, decision, &mut commands).await
                }
                Work::Manage {
                    action,
                    requested_by,
                    reply,
                } => {
                    let result = self.manage(action, &requested_by, &mut commands).await;
                    let _ = reply.send(result);
                }
                Work::Decommission => {
                    // Anything still queued behind the decommission is dropped.
                    commands.close();
                    while let Ok(command) = commands.try_recv() {
                        if let Some(work) = self.accept(command) {
                            self.deferred.push_back(work);
                        }
                    }
                    for work in self.deferred.drain(..) {
                        if let Work::Alert { alert, decision } = work {
                            if decision.action == RemediationAction::Escalate {
                                self.prompt.release(&alert.id);
                            }
                        }
                    }
                    self.emit(LifecycleEvent::SpiritDecommissioned);
                    info!(spirit_id = %self.spirit_id(), "Spirit decommissioned");
                    return;
                }
            }
        }

        debug!(spirit_id = %self.spirit_id(), "Spirit controller stopped");
    }

    /// Deduplicate and classify an incoming command.
    fn accept(&mut self, command: SpiritCommand) -> Option<Work> {
        match command {
            SpiritCommand::Alert(alert) => {
                if !self.seen.insert(alert.id.clone()) {
                    debug!(
                        spirit_id = %self.spirit_id(),
                        alert_id = %alert.id,
                        "Ignoring duplicate alert"
                    );
                    if self.classifier.classify(&alert).action == RemediationAction::Escalate {
                        self.prompt.release(&alert.id);
                    }
                    self.emit(LifecycleEvent::DuplicateAlertIgnored { alert_id: alert.id });
                    return None;
                }

                let decision = self.classifier.classify(&alert);
                debug!(
                    spirit_id = %self.spirit_id(),
                    alert_id = %alert.id,
                    kind = %alert.kind,
                    action = %decision.action,
                    reason = %decision.reason,
                    "Alert classified"
                );
                self.emit(LifecycleEvent::AlertClassified {
                    alert_id: alert.id.clone(),
                    decision: decision.clone(),
                });

                Some(Work::Alert { alert, decision })
            }
            SpiritCommand::Manage {
                action,
                requested_by,
                reply,
            } => Some(Work::Manage {
                action,
                requested_by,
                reply,
            }),
            SpiritCommand::Decommission => Some(Work::Decommission),
        }
    }

    /// Await an external action while still accepting (and parking) new work.
    async fn suspend<F>(
        &mut self,
        action: F,
        commands: &mut mpsc::UnboundedReceiver<SpiritCommand>,
    ) -> F::Output
    where
        F: Future,
    {
        tokio::pin!(action);

        loop {
            tokio::select! {
                output = &mut action => return output,
                Some(command) = commands.recv() => {
                    if let Some(work) = self.accept(command) {
                        if let Work::Alert { alert, .. } = &work {
                            info!(
                                spirit_id = %self.spirit_id(),
                                alert_id = %alert.id,
                                behind = %self.record.state,
                                "Deferring alert until current remediation completes"
                            );
                            self.emit(LifecycleEvent::AlertDeferred {
                                alert_id: alert.id.clone(),
                                behind: self.record.state,
                            });
                        }
                        self.deferred.push_back(work);
                    }
                }
            }
        }
    }

    #[instrument(skip(self, alert, decision, commands), fields(spirit_id = %self.record.id, alert_id = %alert.id))]
    async fn handle_alert(
        &mut self,
        alert: HealthAlert,
        decision: RemediationDecision,
        commands: &mut mpsc::UnboundedReceiver<SpiritCommand>,
    ) {
        if self.record.idle != alert.spirit_idle {
            self.record.idle = alert.spirit_idle;
            self.publish();
        }

        match decision.action {
            RemediationAction::AutoRestart => {
                info!(reason = %decision.reason, "Auto-restarting spirit");
                self.restart(&alert, RestartTrigger::Automatic, commands).await;
            }
            RemediationAction::Escalate => {
                self.escalate(&alert, &decision, commands).await;
            }
        }
    }

    async fn escalate(
        &mut self,
        alert: &HealthAlert,
        decision: &RemediationDecision,
        commands: &mut mpsc::UnboundedReceiver<SpiritCommand>,
    ) {
        self.notify(&format!(
            "Health alert {} for spirit {}: {} (escalated: {})",
            alert.id,
            self.spirit_id(),
            alert.summary(),
            decision.reason
        ));

        self.transition(SpiritState::AwaitingOperator);
        self.emit(LifecycleEvent::OperatorPrompted {
            alert_id: alert.id.clone(),
        });

        let prompt = self.prompt.clone();
        let prompt_alert = alert.clone();
        let timeout = self.prompt_timeout;
        let asked = async move {
            tokio::time::timeout(
                timeout,
                prompt.prompt_for_action(&prompt_alert.spirit_id, &prompt_alert),
            )
            .await
        };

        let outcome = match self.suspend(asked, commands).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(error = %e, "Operator prompt failed, treating as dismissed");
                PromptOutcome::answered(OperatorDecision::Dismiss)
            }
            Err(_) => {
                info!(timeout_secs = timeout.as_secs(), "Operator prompt timed out");
                PromptOutcome::timed_out()
            }
        };

        self.emit(LifecycleEvent::OperatorResponded {
            alert_id: alert.id.clone(),
            decision: outcome.decision,
            timed_out: outcome.timed_out,
        });

        match outcome.decision {
            OperatorDecision::Restart => {
                self.restart(alert, RestartTrigger::Operator, commands).await;
            }
            OperatorDecision::Dismiss => {
                let message = if outcome.timed_out {
                    format!(
                        "No operator response for alert {} on spirit {}; dismissed",
                        alert.id,
                        self.spirit_id()
                    )
                } else {
                    format!(
                        "Operator dismissed alert {} on spirit {}",
                        alert.id,
                        self.spirit_id()
                    )
                };
                self.log(&message);
                self.acknowledge(&alert.id);
                self.transition(SpiritState::Idle);
            }
        }
    }

    async fn restart(
        &mut self,
        alert: &HealthAlert,
        trigger: RestartTrigger,
        commands: &mut mpsc::UnboundedReceiver<SpiritCommand>,
    ) {
        self.transition(SpiritState::Restarting);

        let service = self.service.clone();
        let spirit_id = self.spirit_id().clone();
        let result = self
            .suspend(async move { service.restart_service(&spirit_id).await }, commands)
            .await;

        self.record.last_action_at = Some(Utc::now());

        match result {
            Ok(()) => {
                let (logged, notified) = match trigger {
                    RestartTrigger::Automatic => (
                        format!(
                            "Auto-restarted spirit {} due to health alert {}",
                            self.spirit_id(),
                            alert.id
                        ),
                        format!("Spirit {} restarted automatically.", self.spirit_id()),
                    ),
                    RestartTrigger::Operator => (
                        format!(
                            "Operator restarted spirit {} after health alert {}",
                            self.spirit_id(),
                            alert.id
                        ),
                        format!("Spirit {} restarted by operator.", self.spirit_id()),
                    ),
                };
                self.log(&logged);
                self.acknowledge(&alert.id);
                self.notify(&notified);
                self.emit(LifecycleEvent::RestartCompleted {
                    alert_id: Some(alert.id.clone()),
                });
                info!(spirit_id = %self.spirit_id(), "Restart completed");
            }
            Err(e) => {
                self.restart_failed(&e, Some(&alert.id));
                self.acknowledge(&alert.id);
            }
        }

        self.transition(SpiritState::Idle);
    }

    fn restart_failed(&self, e: &RestartError, alert_id: Option<&AlertId>) {
        error!(spirit_id = %self.spirit_id(), error = %e, "Restart failed");
        let message = match alert_id {
            Some(alert_id) => format!("{} (alert {})", e, alert_id),
            None => e.to_string(),
        };
        self.log(&message);
        self.notify(&message);
        self.emit(LifecycleEvent::RestartFailed {
            alert_id: alert_id.cloned(),
            reason: e.reason.clone(),
        });
    }

    #[instrument(skip(self, commands), fields(spirit_id = %self.record.id))]
    async fn manage(
        &mut self,
        action: ServiceAction,
        requested_by: &str,
        commands: &mut mpsc::UnboundedReceiver<SpiritCommand>,
    ) -> HealthResult<()> {
        self.log(&format!(
            "Service {} requested for spirit {} by {}",
            action,
            self.spirit_id(),
            requested_by
        ));

        if action == ServiceAction::Restart {
            self.transition(SpiritState::Restarting);
        }

        let service = self.service.clone();
        let spirit_id = self.spirit_id().clone();
        let result = self
            .suspend(async move { service.execute(&spirit_id, action).await }, commands)
            .await;

        self.record.last_action_at = Some(Utc::now());

        let outcome: HealthResult<()> = match result {
            Ok(()) => {
                self.notify(&format!(
                    "Service {} completed for spirit {}",
                    action,
                    self.spirit_id()
                ));
                Ok(())
            }
            Err(e) => {
                if action == ServiceAction::Restart {
                    self.restart_failed(&e, None);
                } else {
                    error!(error = %e, "Service action failed");
                    self.log(&e.to_string());
                    self.notify(&e.to_string());
                }
                Err(e.into())
            }
        };

        self.emit(LifecycleEvent::ServiceActionCompleted {
            action,
            success: outcome.is_ok(),
        });

        // Publishes last_action_at even when no state change happens.
        if self.record.state == SpiritState::Idle {
            self.publish();
        } else {
            self.transition(SpiritState::Idle);
        }

        outcome
    }

    fn transition(&mut self, to: SpiritState) {
        let from = self.record.state;
        if from == to {
            return;
        }

        debug!(spirit_id = %self.spirit_id(), from = %from, to = %to, "State transition");
        self.record.state = to;
        self.publish();
        self.emit(LifecycleEvent::StateChanged { from, to });
    }

    fn publish(&self) {
        self.record_tx.send_replace(self.record.clone());
    }

    fn emit(&self, event: LifecycleEvent) {
        let _ = self
            .event_tx
            .send(LifecycleEventEnvelope::new(self.record.id.clone(), event));
    }

    fn log(&self, message: &str) {
        if let Err(e) = self.log.log_action(message) {
            warn!(spirit_id = %self.spirit_id(), error = %e, "Failed to log action");
        }
    }

    fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.notify_admin(message) {
            warn!(spirit_id = %self.spirit_id(), error = %e, "Failed to notify admin");
        }
    }

    fn acknowledge(&self, alert_id: &AlertId) {
        if let Err(e) = self.acknowledger.acknowledge_alert(alert_id) {
            warn!(
                spirit_id = %self.spirit_id(),
                alert_id = %alert_id,
                error = %e,
                "Failed to acknowledge alert"
            );
        }
    }
}
