//! Ghostpaw Types - Core types for spirit health and lifecycle
//!
//! Ghostpaw supervises long-running "spirit" service instances. Health alerts
//! about a spirit either trigger an automatic restart or are escalated to a
//! human operator.
//!
//! ## Key Concepts
//!
//! - **Spirit**: A long-running named service instance
//! - **HealthAlert**: Immutable report from the external health monitor
//! - **RemediationDecision**: Auto-restart or escalate, with a reason
//! - **SpiritState**: Per-spirit lifecycle state (`Idle`, `Restarting`, `AwaitingOperator`)
//! - **Events**: Lifecycle observability stream

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod alert;
pub mod events;
pub mod ids;
pub mod lifecycle;
pub mod remediation;

// Re-export main types
pub use alert::{AlertKind, HealthAlert};
pub use events::{EventSeverity, LifecycleEvent, LifecycleEventEnvelope};
pub use ids::{AlertId, SpiritId};
pub use lifecycle::{ServiceAction, SpiritRecord, SpiritState};
pub use remediation::{
    OperatorDecision, OperatorResponse, PromptOutcome, RemediationAction, RemediationDecision,
};
