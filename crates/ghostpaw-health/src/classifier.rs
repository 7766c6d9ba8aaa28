//! Alert classification.
//!
//! A spirit is restarted without asking anyone only when all three hold:
//! the alert is a memory alert, the value is strictly over the threshold,
//! and the spirit reported itself idle. Everything else goes to an operator.

use ghostpaw_types::{AlertKind, HealthAlert, RemediationDecision};

/// Stateless per-alert classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertClassifier;

impl AlertClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Decide between auto-restart and escalation for a single alert.
    ///
    /// Escalation reasons name every condition that failed, in the order
    /// kind, threshold, idle.
    pub fn classify(&self, alert: &HealthAlert) -> RemediationDecision {
        let mut failed = Vec::new();

        if alert.kind != AlertKind::Memory {
            failed.push(format!("alert kind is {}, not memory", alert.kind));
        }
        if !alert.exceeds_threshold() {
            failed.push(format!(
                "value {} does not exceed threshold {}",
                alert.value, alert.threshold
            ));
        }
        if !alert.spirit_idle {
            failed.push("spirit is not idle".to_string());
        }

        if failed.is_empty() {
            RemediationDecision::auto_restart(format!(
                "memory {} over threshold {} while idle",
                alert.value, alert.threshold
            ))
        } else {
            RemediationDecision::escalate(failed.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostpaw_types::RemediationAction;
    use proptest::prelude::*;

    fn alert(kind: AlertKind, value: f64, threshold: f64, idle: bool) -> HealthAlert {
        HealthAlert::new("a1", "eira", kind, value, threshold, idle)
    }

    #[test]
    fn test_idle_memory_over_threshold_restarts() {
        let decision = AlertClassifier::new().classify(&alert(AlertKind::Memory, 90.0, 80.0, true));
        assert_eq!(decision.action, RemediationAction::AutoRestart);
        assert_eq!(decision.reason, "memory 90 over threshold 80 while idle");
    }

    #[test]
    fn test_busy_spirit_escalates() {
        let decision = AlertClassifier::new().classify(&alert(AlertKind::Memory, 90.0, 80.0, false));
        assert_eq!(decision.action, RemediationAction::Escalate);
        assert_eq!(decision.reason, "spirit is not idle");
    }

    #[test]
    fn test_value_at_threshold_escalates() {
        let decision = AlertClassifier::new().classify(&alert(AlertKind::Memory, 80.0, 80.0, true));
        assert_eq!(decision.action, RemediationAction::Escalate);
        assert_eq!(decision.reason, "value 80 does not exceed threshold 80");
    }

    #[test]
    fn test_other_kinds_escalate() {
        for kind in [AlertKind::Cpu, AlertKind::Latency, AlertKind::ErrorRate, AlertKind::Unknown] {
            let decision = AlertClassifier::new().classify(&alert(kind, 99.0, 10.0, true));
            assert_eq!(decision.action, RemediationAction::Escalate);
            assert!(decision.reason.contains("not memory"), "{}", decision.reason);
        }
    }

    #[test]
    fn test_every_failed_condition_is_named() {
        let decision = AlertClassifier::new().classify(&alert(AlertKind::Cpu, 10.0, 80.0, false));
        assert_eq!(
            decision.reason,
            "alert kind is cpu, not memory; value 10 does not exceed threshold 80; spirit is not idle"
        );
    }

    #[test]
    fn test_nan_value_escalates() {
        let decision = AlertClassifier::new().classify(&alert(AlertKind::Memory, f64::NAN, 80.0, true));
        assert_eq!(decision.action, RemediationAction::Escalate);
    }

    fn arb_kind() -> impl Strategy<Value = AlertKind> {
        prop_oneof![
            Just(AlertKind::Memory),
            Just(AlertKind::Cpu),
            Just(AlertKind::Latency),
            Just(AlertKind::ErrorRate),
            Just(AlertKind::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn property_classification_is_deterministic(
            kind in arb_kind(),
            value in -1000.0f64..1000.0,
            threshold in -1000.0f64..1000.0,
            idle in any::<bool>(),
        ) {
            let a = alert(kind, value, threshold, idle);
            let classifier = AlertClassifier::new();
            let first = classifier.classify(&a);
            let second = classifier.classify(&a.clone());
            prop_assert_eq!(&first, &second);

            let expected_restart = kind == AlertKind::Memory && value > threshold && idle;
            prop_assert_eq!(first.is_auto_restart(), expected_restart);
        }
    }
}
