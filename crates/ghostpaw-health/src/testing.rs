//! Recording port doubles for exercising controllers without real I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ghostpaw_types::{AlertId, HealthAlert, OperatorDecision, PromptOutcome, ServiceAction, SpiritId};
use tokio::sync::Semaphore;

use crate::error::{HealthResult, PortError, RestartError};
use crate::ports::{
    ActivityLog, AdminNotifier, AlertAcknowledger, LifecyclePorts, OperatorPrompt, ServiceControl,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Concurrency {
    current: usize,
    max: usize,
}

/// Service control that records every call.
///
/// A gated instance holds each call until [`RecordingServiceControl::release`]
/// hands out a permit.
#[derive(Default)]
pub struct RecordingServiceControl {
    actions: Mutex<Vec<(SpiritId, ServiceAction)>>,
    concurrency: Mutex<HashMap<SpiritId, Concurrency>>,
    gate: Option<Arc<Semaphore>>,
    fail: AtomicBool,
}

impl RecordingServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `n` gated calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<(SpiritId, ServiceAction)> {
        lock(&self.actions).clone()
    }

    pub fn restart_count(&self) -> usize {
        lock(&self.actions)
            .iter()
            .filter(|(_, action)| *action == ServiceAction::Restart)
            .count()
    }

    pub fn restarts_for(&self, spirit_id: &SpiritId) -> usize {
        lock(&self.actions)
            .iter()
            .filter(|(id, action)| id == spirit_id && *action == ServiceAction::Restart)
            .count()
    }

    /// Calls currently in flight for a spirit.
    pub fn in_flight(&self, spirit_id: &SpiritId) -> usize {
        lock(&self.concurrency)
            .get(spirit_id)
            .map(|c| c.current)
            .unwrap_or(0)
    }

    /// Highest number of simultaneous calls ever seen for a spirit.
    pub fn max_concurrent(&self, spirit_id: &SpiritId) -> usize {
        lock(&self.concurrency)
            .get(spirit_id)
            .map(|c| c.max)
            .unwrap_or(0)
    }

    async fn record(&self, spirit_id: &SpiritId, action: ServiceAction) -> Result<(), RestartError> {
        lock(&self.actions).push((spirit_id.clone(), action));
        {
            let mut concurrency = lock(&self.concurrency);
            let entry = concurrency.entry(spirit_id.clone()).or_default();
            entry.current += 1;
            entry.max = entry.max.max(entry.current);
        }

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(entry) = lock(&self.concurrency).get_mut(spirit_id) {
            entry.current -= 1;
        }

        if self.fail.load(Ordering::SeqCst) {
            Err(RestartError::new(spirit_id.clone(), action, "simulated failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ServiceControl for RecordingServiceControl {
    async fn restart_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.record(spirit_id, ServiceAction::Restart).await
    }

    async fn start_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.record(spirit_id, ServiceAction::Start).await
    }

    async fn stop_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.record(spirit_id, ServiceAction::Stop).await
    }
}

/// Message sink shared by the log and notifier doubles.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages but report every write as failed.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.messages).iter().any(|m| m.contains(needle))
    }

    fn push(&self, port: &'static str, message: &str) -> Result<(), PortError> {
        lock(&self.messages).push(message.to_string());
        if self.fail.load(Ordering::SeqCst) {
            Err(PortError::new(port, "simulated failure"))
        } else {
            Ok(())
        }
    }
}

impl ActivityLog for RecordingSink {
    fn log_action(&self, message: &str) -> Result<(), PortError> {
        self.push("log", message)
    }
}

impl AdminNotifier for RecordingSink {
    fn notify_admin(&self, message: &str) -> Result<(), PortError> {
        self.push("notify", message)
    }
}

/// Acknowledger that counts every acknowledgement call per alert id.
#[derive(Default)]
pub struct RecordingAcknowledger {
    calls: Mutex<Vec<AlertId>>,
}

impl RecordingAcknowledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, alert_id: &AlertId) -> usize {
        lock(&self.calls).iter().filter(|id| *id == alert_id).count()
    }

    pub fn total(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl AlertAcknowledger for RecordingAcknowledger {
    fn acknowledge_alert(&self, alert_id: &AlertId) -> Result<(), PortError> {
        lock(&self.calls).push(alert_id.clone());
        Ok(())
    }
}

/// Operator that always answers the same way, or never answers.
pub struct ScriptedOperator {
    decision: Option<OperatorDecision>,
    prompts: AtomicUsize,
}

impl ScriptedOperator {
    pub fn answering(decision: OperatorDecision) -> Self {
        Self {
            decision: Some(decision),
            prompts: AtomicUsize::new(0),
        }
    }

    /// An operator who never responds; prompts only end by timeout.
    pub fn silent() -> Self {
        Self {
            decision: None,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedOperator {
    async fn prompt_for_action(
        &self,
        _spirit_id: &SpiritId,
        _alert: &HealthAlert,
    ) -> HealthResult<PromptOutcome> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self.decision {
            Some(decision) => Ok(PromptOutcome::answered(decision)),
            None => std::future::pending().await,
        }
    }
}

/// All recording doubles bundled together.
#[derive(Clone)]
pub struct RecordingPorts {
    pub service: Arc<RecordingServiceControl>,
    pub log: Arc<RecordingSink>,
    pub notifier: Arc<RecordingSink>,
    pub acknowledger: Arc<RecordingAcknowledger>,
}

impl RecordingPorts {
    pub fn new() -> Self {
        Self::with_service(RecordingServiceControl::new())
    }

    pub fn gated() -> Self {
        Self::with_service(RecordingServiceControl::gated())
    }

    fn with_service(service: RecordingServiceControl) -> Self {
        Self {
            service: Arc::new(service),
            log: Arc::new(RecordingSink::new()),
            notifier: Arc::new(RecordingSink::new()),
            acknowledger: Arc::new(RecordingAcknowledger::new()),
        }
    }

    /// Ports without an operator prompt; the intake answers prompts itself.
    pub fn ports(&self) -> LifecyclePorts {
        LifecyclePorts::new(
            self.service.clone(),
            self.log.clone(),
            self.notifier.clone(),
            self.acknowledger.clone(),
        )
    }

    pub fn ports_with_prompt(&self, prompt: Arc<dyn OperatorPrompt>) -> LifecyclePorts {
        self.ports().with_prompt(prompt)
    }
}

impl Default for RecordingPorts {
    fn default() -> Self {
        Self::new()
    }
}
