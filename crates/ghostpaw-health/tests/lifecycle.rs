//! End-to-end lifecycle scenarios driven through the alert intake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ghostpaw_health::testing::{RecordingPorts, ScriptedOperator};
use ghostpaw_health::{AlertIntake, HealthAlertFeed, HealthError, HealthResult, LifecycleConfig};
use ghostpaw_types::{
    AlertId, AlertKind, HealthAlert, LifecycleEvent, LifecycleEventEnvelope, OperatorDecision,
    OperatorResponse, ServiceAction, SpiritId, SpiritState,
};
use tokio::sync::broadcast;

const WITHIN: Duration = Duration::from_secs(10);

fn memory_idle(id: &str, spirit: &str) -> HealthAlert {
    HealthAlert::new(id, spirit, AlertKind::Memory, 91.0, 80.0, true)
}

fn cpu_busy(id: &str, spirit: &str) -> HealthAlert {
    HealthAlert::new(id, spirit, AlertKind::Cpu, 97.0, 90.0, false)
}

/// Wait for the first event matching `pred`, skipping everything else.
async fn expect_event<F>(
    events: &mut broadcast::Receiver<LifecycleEventEnvelope>,
    within: Duration,
    pred: F,
) -> LifecycleEventEnvelope
where
    F: Fn(&LifecycleEventEnvelope) -> bool,
{
    tokio::time::timeout(within, async {
        loop {
            let envelope = events.recv().await.expect("event channel closed");
            if pred(&envelope) {
                return envelope;
            }
        }
    })
    .await
    .expect("expected event was not emitted")
}

fn drain(events: &mut broadcast::Receiver<LifecycleEventEnvelope>) -> Vec<LifecycleEvent> {
    let mut out = Vec::new();
    while let Ok(envelope) = events.try_recv() {
        out.push(envelope.event);
    }
    out
}

async fn wait_for_state(intake: &AlertIntake, spirit: &str, state: SpiritState) {
    let mut record = intake
        .watch_spirit(&SpiritId::new(spirit))
        .expect("spirit is not tracked");
    tokio::time::timeout(WITHIN, record.wait_for(|r| r.state == state))
        .await
        .expect("state not reached in time")
        .expect("spirit task stopped");
}

async fn wait_for_prompt(intake: &AlertIntake, alert_id: &str) {
    let alert_id = AlertId::new(alert_id);
    tokio::time::timeout(WITHIN, async {
        while !intake.pending_prompts().is_pending(&alert_id) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("prompt never opened");
}

#[tokio::test]
async fn test_idle_memory_alert_restarts_once() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();

    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    intake.shutdown().await;

    assert_eq!(recording.service.restart_count(), 1);
    assert_eq!(recording.acknowledger.count(&AlertId::new("a1")), 1);
    assert!(recording
        .log
        .contains("Auto-restarted spirit eira due to health alert a1"));
    assert!(recording.notifier.contains("Spirit eira restarted automatically."));

    let seen = drain(&mut events);
    assert!(seen.iter().any(|e| matches!(
        e,
        LifecycleEvent::DuplicateAlertIgnored { alert_id } if alert_id.as_str() == "a1"
    )));
    assert_eq!(
        seen.iter()
            .filter(|e| matches!(e, LifecycleEvent::RestartCompleted { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_escalation_then_operator_restart() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();

    intake.submit_alert(cpu_busy("a2", "eira")).unwrap();
    wait_for_prompt(&intake, "a2").await;

    assert_eq!(
        intake.get_spirit_state(&SpiritId::new("eira")),
        Some(SpiritState::AwaitingOperator)
    );
    assert!(recording.notifier.contains("Health alert a2 for spirit eira"));
    assert_eq!(recording.service.restart_count(), 0);

    assert!(intake.submit_operator_response(OperatorResponse::new("a2", " Restart ")));
    expect_event(&mut events, WITHIN, |e| {
        matches!(e.event, LifecycleEvent::RestartCompleted { .. })
    })
    .await;
    wait_for_state(&intake, "eira", SpiritState::Idle).await;

    assert_eq!(recording.service.restart_count(), 1);
    assert_eq!(recording.acknowledger.count(&AlertId::new("a2")), 1);
    assert!(recording.notifier.contains("Spirit eira restarted by operator."));

    // The prompt is gone once answered.
    assert!(!intake.submit_operator_response(OperatorResponse::new("a2", "restart")));
}

#[tokio::test]
async fn test_operator_dismiss_acknowledges_without_restart() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());

    intake.submit_alert(cpu_busy("a3", "eira")).unwrap();
    wait_for_prompt(&intake, "a3").await;
    assert!(intake.submit_operator_response(OperatorResponse::new("a3", "ignore it")));
    intake.shutdown().await;

    assert_eq!(recording.service.restart_count(), 0);
    assert_eq!(recording.acknowledger.count(&AlertId::new("a3")), 1);
    assert!(recording.log.contains("Operator dismissed alert a3 on spirit eira"));
}

#[tokio::test(start_paused = true)]
async fn test_prompt_timeout_dismisses() {
    let recording = RecordingPorts::new();
    let config = LifecycleConfig::default().with_prompt_timeout(Duration::from_secs(300));
    let intake = AlertIntake::new(config, recording.ports());
    let mut events = intake.subscribe();

    intake.submit_alert(cpu_busy("a4", "eira")).unwrap();
    // Queued behind the open prompt, handled after the timeout.
    intake.submit_alert(memory_idle("a5", "eira")).unwrap();

    let responded = expect_event(&mut events, Duration::from_secs(3600), |e| {
        matches!(e.event, LifecycleEvent::OperatorResponded { .. })
    })
    .await;
    assert!(matches!(
        responded.event,
        LifecycleEvent::OperatorResponded {
            decision: OperatorDecision::Dismiss,
            timed_out: true,
            ..
        }
    ));

    intake.shutdown().await;

    assert_eq!(recording.acknowledger.count(&AlertId::new("a4")), 1);
    assert!(recording.log.contains("No operator response for alert a4"));
    // Only the deferred alert restarted the spirit.
    assert_eq!(recording.service.restart_count(), 1);
    assert!(recording.log.contains("health alert a5"));

    let seen = drain(&mut events);
    assert!(seen.iter().any(|e| matches!(
        e,
        LifecycleEvent::AlertDeferred { behind: SpiritState::AwaitingOperator, .. }
    )));
}

#[tokio::test]
async fn test_alerts_during_restart_are_deferred() {
    let recording = RecordingPorts::gated();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();
    let eira = SpiritId::new("eira");

    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    wait_for_state(&intake, "eira", SpiritState::Restarting).await;

    intake.submit_alert(memory_idle("a2", "eira")).unwrap();
    expect_event(&mut events, WITHIN, |e| {
        matches!(&e.event, LifecycleEvent::AlertDeferred { alert_id, .. } if alert_id.as_str() == "a2")
    })
    .await;

    assert_eq!(intake.get_spirit_state(&eira), Some(SpiritState::Restarting));
    assert_eq!(recording.service.in_flight(&eira), 1);
    assert_eq!(recording.service.restart_count(), 1);

    recording.service.release(2);
    intake.shutdown().await;

    assert_eq!(recording.service.restarts_for(&eira), 2);
    assert_eq!(recording.service.max_concurrent(&eira), 1);

    let log = recording.log.messages();
    let first = log.iter().position(|m| m.contains("health alert a1")).unwrap();
    let second = log.iter().position(|m| m.contains("health alert a2")).unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_restart_failure_reports_and_returns_to_idle() {
    let recording = RecordingPorts::new();
    recording.service.set_failing(true);
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();

    intake.submit_alert(memory_idle("a6", "eira")).unwrap();
    let failed = expect_event(&mut events, WITHIN, |e| {
        matches!(e.event, LifecycleEvent::RestartFailed { .. })
    })
    .await;
    wait_for_state(&intake, "eira", SpiritState::Idle).await;

    assert!(matches!(
        failed.event,
        LifecycleEvent::RestartFailed { alert_id: Some(ref id), .. } if id.as_str() == "a6"
    ));
    assert!(recording.log.contains("Service restart failed for spirit eira"));
    assert!(recording.notifier.contains("Service restart failed for spirit eira"));
    assert!(!recording.notifier.contains("restarted automatically"));
    assert_eq!(recording.acknowledger.count(&AlertId::new("a6")), 1);
}

#[tokio::test]
async fn test_spirits_are_independent() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();

    intake.submit_alert(cpu_busy("b1", "brann")).unwrap();
    wait_for_prompt(&intake, "b1").await;

    intake.submit_alert(memory_idle("e1", "eira")).unwrap();
    expect_event(&mut events, WITHIN, |e| {
        e.spirit_id.as_str() == "eira" && matches!(e.event, LifecycleEvent::RestartCompleted { .. })
    })
    .await;

    assert_eq!(
        intake.get_spirit_state(&SpiritId::new("brann")),
        Some(SpiritState::AwaitingOperator)
    );
    assert_eq!(recording.service.restarts_for(&SpiritId::new("eira")), 1);
    assert_eq!(recording.service.restarts_for(&SpiritId::new("brann")), 0);

    assert!(intake.submit_operator_response(OperatorResponse::new("b1", "dismiss")));
    wait_for_state(&intake, "brann", SpiritState::Idle).await;
    assert_eq!(intake.spirits().len(), 2);
}

#[tokio::test]
async fn test_ports_prompt_overrides_pending_registry() {
    let recording = RecordingPorts::new();
    let operator = Arc::new(ScriptedOperator::answering(OperatorDecision::Restart));
    let intake = AlertIntake::new(
        LifecycleConfig::default(),
        recording.ports_with_prompt(operator.clone()),
    );

    intake.submit_alert(cpu_busy("a7", "eira")).unwrap();
    intake.shutdown().await;

    assert_eq!(operator.prompt_count(), 1);
    assert_eq!(recording.service.restart_count(), 1);
    assert!(intake.pending_prompts().pending().is_empty());
}

#[tokio::test]
async fn test_port_failures_do_not_stop_remediation() {
    let recording = RecordingPorts::new();
    recording.log.set_failing(true);
    recording.notifier.set_failing(true);
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());

    intake.submit_alert(memory_idle("a8", "eira")).unwrap();
    intake.submit_alert(memory_idle("a9", "eira")).unwrap();
    intake.shutdown().await;

    assert_eq!(recording.service.restart_count(), 2);
    assert_eq!(recording.acknowledger.total(), 2);
}

#[tokio::test]
async fn test_manage_service() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let eira = SpiritId::new("eira");

    intake
        .manage_service(&eira, ServiceAction::Stop, "owner")
        .await
        .unwrap();
    intake
        .manage_service(&eira, ServiceAction::Start, "owner")
        .await
        .unwrap();

    assert_eq!(
        recording.service.actions(),
        vec![
            (eira.clone(), ServiceAction::Stop),
            (eira.clone(), ServiceAction::Start)
        ]
    );
    assert!(recording
        .log
        .contains("Service stop requested for spirit eira by owner"));
    assert!(recording.notifier.contains("Service start completed for spirit eira"));

    let record = intake.get_spirit_record(&eira).unwrap();
    assert_eq!(record.state, SpiritState::Idle);
    assert!(record.last_action_at.is_some());
}

#[tokio::test]
async fn test_manage_service_failure_is_returned() {
    let recording = RecordingPorts::new();
    recording.service.set_failing(true);
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let eira = SpiritId::new("eira");

    let result = intake
        .manage_service(&eira, ServiceAction::Restart, "admin")
        .await;

    assert!(matches!(result, Err(HealthError::RemediationFailed(_))));
    assert_eq!(intake.get_spirit_state(&eira), Some(SpiritState::Idle));
    assert!(recording.notifier.contains("Service restart failed for spirit eira"));
}

#[tokio::test]
async fn test_decommission_starts_fresh() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();
    let eira = SpiritId::new("eira");

    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    intake.decommission(&eira).await.unwrap();

    assert_eq!(intake.get_spirit_state(&eira), None);
    assert_eq!(recording.service.restart_count(), 1);
    expect_event(&mut events, WITHIN, |e| {
        matches!(e.event, LifecycleEvent::SpiritDecommissioned)
    })
    .await;

    // A new controller has no memory of earlier alert ids.
    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    intake.shutdown().await;
    assert_eq!(recording.service.restart_count(), 2);
}

#[tokio::test]
async fn test_alert_during_decommission_waits_for_old_controller() {
    let recording = RecordingPorts::gated();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let mut events = intake.subscribe();
    let eira = SpiritId::new("eira");

    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    wait_for_state(&intake, "eira", SpiritState::Restarting).await;

    let decommission = intake.decommission(&eira);
    tokio::pin!(decommission);
    // A single poll queues the decommission behind the in-flight restart.
    tokio::select! {
        biased;
        _ = &mut decommission => panic!("decommission finished while a restart was in flight"),
        _ = std::future::ready(()) => {}
    }

    intake.submit_alert(memory_idle("a2", "eira")).unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(recording.service.restart_count(), 1);
    assert_eq!(recording.service.in_flight(&eira), 1);

    recording.service.release(2);
    decommission.await.unwrap();

    // The successor controller stays registered.
    assert!(intake.get_spirit_state(&eira).is_some());
    intake.shutdown().await;

    assert_eq!(recording.service.restarts_for(&eira), 2);
    assert_eq!(recording.service.max_concurrent(&eira), 1);

    let seen = drain(&mut events);
    let decommissioned = seen
        .iter()
        .position(|e| matches!(e, LifecycleEvent::SpiritDecommissioned))
        .unwrap();
    let second_restart = seen
        .iter()
        .position(|e| matches!(
            e,
            LifecycleEvent::RestartCompleted { alert_id: Some(id) } if id.as_str() == "a2"
        ))
        .unwrap();
    assert!(decommissioned < second_restart);
}

#[tokio::test]
async fn test_answer_for_deferred_alert_is_kept() {
    let recording = RecordingPorts::gated();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let eira = SpiritId::new("eira");

    intake.submit_alert(memory_idle("a1", "eira")).unwrap();
    wait_for_state(&intake, "eira", SpiritState::Restarting).await;

    // a2 is parked behind the restart; its prompt is not open yet.
    intake.submit_alert(cpu_busy("a2", "eira")).unwrap();
    assert!(!intake.pending_prompts().is_pending(&AlertId::new("a2")));
    assert!(intake.submit_operator_response(OperatorResponse::new("a2", "restart")));

    recording.service.release(2);
    intake.shutdown().await;

    assert_eq!(recording.service.restarts_for(&eira), 2);
    assert!(recording
        .log
        .contains("Operator restarted spirit eira after health alert a2"));
    assert!(!recording.log.contains("No operator response for alert a2"));
    assert!(!intake.pending_prompts().is_tracked(&AlertId::new("a2")));
}

#[tokio::test]
async fn test_answer_for_redelivered_alert_is_rejected() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());

    intake.submit_alert(cpu_busy("a3", "eira")).unwrap();
    wait_for_prompt(&intake, "a3").await;
    assert!(intake.submit_operator_response(OperatorResponse::new("a3", "dismiss")));
    wait_for_state(&intake, "eira", SpiritState::Idle).await;

    // The re-delivery is ignored by the controller, so nothing holds an answer for it.
    intake.submit_alert(cpu_busy("a3", "eira")).unwrap();
    intake.shutdown().await;

    assert!(!intake.pending_prompts().is_tracked(&AlertId::new("a3")));
    assert!(!intake.submit_operator_response(OperatorResponse::new("a3", "restart")));
    assert_eq!(recording.service.restart_count(), 0);
}

struct FixedFeed(Vec<HealthAlert>);

#[async_trait]
impl HealthAlertFeed for FixedFeed {
    async fn get_health_alerts(&self) -> HealthResult<Vec<HealthAlert>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_drain_feed() {
    let recording = RecordingPorts::new();
    let intake = AlertIntake::new(LifecycleConfig::default(), recording.ports());
    let feed = FixedFeed(vec![
        memory_idle("f1", "eira"),
        memory_idle("f2", "brann"),
        memory_idle("f1", "eira"),
    ]);

    let submitted = intake.drain_feed(&feed).await.unwrap();
    intake.shutdown().await;

    assert_eq!(submitted, 3);
    assert_eq!(recording.service.restart_count(), 2);
}
