//! Operator prompts answered through the intake.
//!
//! The intake registers every alert it expects to escalate as soon as the
//! alert is submitted, before the spirit's task gets to it. The dashboard
//! answers via [`PendingPrompts::respond`], keyed by alert id. An answer that
//! arrives before the controller opens its prompt is held in the slot and
//! consumed when the prompt opens. A slot is removed once its last expected
//! prompt finishes (answered, timed out, or released), so a late answer is
//! ignored.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ghostpaw_types::{AlertId, HealthAlert, OperatorDecision, PromptOutcome, SpiritId};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::HealthResult;
use crate::ports::OperatorPrompt;

struct Slot {
    spirit_id: SpiritId,
    /// Escalations submitted for this alert id whose prompt has not finished.
    outstanding: usize,
    /// Set while the controller is waiting on the operator.
    waiter: Option<oneshot::Sender<OperatorDecision>>,
    /// Answer received before the prompt opened.
    early: Option<OperatorDecision>,
}

impl Slot {
    fn new(spirit_id: SpiritId) -> Self {
        Self {
            spirit_id,
            outstanding: 0,
            waiter: None,
            early: None,
        }
    }
}

/// Registry of prompts waiting on an operator
#[derive(Clone, Default)]
pub struct PendingPrompts {
    slots: Arc<DashMap<AlertId, Slot>>,
}

impl PendingPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `alert` will be escalated once its spirit gets to it.
    pub fn expect(&self, alert: &HealthAlert) {
        let mut slot = self
            .slots
            .entry(alert.id.clone())
            .or_insert_with(|| Slot::new(alert.spirit_id.clone()));
        slot.outstanding += 1;
    }

    /// Deliver an operator decision.
    ///
    /// Returns `false` when no escalation for that alert id is outstanding.
    /// An answer for an escalation that has not opened its prompt yet is kept
    /// until it does; a later answer replaces an earlier one.
    pub fn respond(&self, alert_id: &AlertId, decision: OperatorDecision) -> bool {
        let Some(mut slot) = self.slots.get_mut(alert_id) else {
            return false;
        };

        match slot.waiter.take() {
            Some(reply) => {
                debug!(
                    alert_id = %alert_id,
                    spirit_id = %slot.spirit_id,
                    decision = %decision,
                    "Delivering operator decision"
                );
                reply.send(decision).is_ok()
            }
            None if slot.outstanding > 0 => {
                debug!(
                    alert_id = %alert_id,
                    spirit_id = %slot.spirit_id,
                    decision = %decision,
                    "Holding operator decision until the prompt opens"
                );
                slot.early = Some(decision);
                true
            }
            None => false,
        }
    }

    /// Give up one expected escalation that will never be prompted for.
    pub fn release(&self, alert_id: &AlertId) {
        if let Some(mut slot) = self.slots.get_mut(alert_id) {
            slot.outstanding = slot.outstanding.saturating_sub(1);
        }
        self.remove_if_done(alert_id);
    }

    /// Alerts currently waiting on an operator, with their spirit.
    pub fn pending(&self) -> Vec<(AlertId, SpiritId)> {
        self.slots
            .iter()
            .filter(|r| r.value().waiter.is_some())
            .map(|r| (r.key().clone(), r.value().spirit_id.clone()))
            .collect()
    }

    /// Whether a prompt for this alert is open right now.
    pub fn is_pending(&self, alert_id: &AlertId) -> bool {
        self.slots
            .get(alert_id)
            .map(|slot| slot.waiter.is_some())
            .unwrap_or(false)
    }

    /// Whether any expected escalation or held answer remains for this alert.
    pub fn is_tracked(&self, alert_id: &AlertId) -> bool {
        self.slots.contains_key(alert_id)
    }

    fn finish(&self, alert_id: &AlertId) {
        if let Some(mut slot) = self.slots.get_mut(alert_id) {
            slot.waiter = None;
            slot.outstanding = slot.outstanding.saturating_sub(1);
        }
        self.remove_if_done(alert_id);
    }

    fn remove_if_done(&self, alert_id: &AlertId) {
        self.slots
            .remove_if(alert_id, |_, slot| slot.outstanding == 0 && slot.waiter.is_none());
    }
}

/// Finishes the prompt when the waiting future completes or is dropped.
struct PromptGuard {
    prompts: PendingPrompts,
    alert_id: AlertId,
}

impl Drop for PromptGuard {
    fn drop(&mut self) {
        self.prompts.finish(&self.alert_id);
    }
}

enum Opened {
    Answered(OperatorDecision),
    Waiting(oneshot::Receiver<OperatorDecision>),
}

#[async_trait]
impl OperatorPrompt for PendingPrompts {
    async fn prompt_for_action(
        &self,
        spirit_id: &SpiritId,
        alert: &HealthAlert,
    ) -> HealthResult<PromptOutcome> {
        let _guard = PromptGuard {
            prompts: self.clone(),
            alert_id: alert.id.clone(),
        };

        let opened = {
            let mut slot = self
                .slots
                .entry(alert.id.clone())
                .or_insert_with(|| Slot::new(spirit_id.clone()));
            if slot.outstanding == 0 {
                // Prompted without a prior expect.
                slot.outstanding = 1;
            }
            match slot.early.take() {
                Some(decision) => Opened::Answered(decision),
                None => {
                    let (reply, decision) = oneshot::channel();
                    slot.waiter = Some(reply);
                    Opened::Waiting(decision)
                }
            }
        };

        match opened {
            Opened::Answered(decision) => Ok(PromptOutcome::answered(decision)),
            Opened::Waiting(decision) => match decision.await {
                Ok(decision) => Ok(PromptOutcome::answered(decision)),
                // Sender dropped without an answer.
                Err(_) => Ok(PromptOutcome::timed_out()),
            },
        }
    }

    fn release(&self, alert_id: &AlertId) {
        PendingPrompts::release(self, alert_id);
    }
}
