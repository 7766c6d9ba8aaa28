//! # Ghostpaw Health - Alert Classification and Spirit Lifecycle Control
//!
//! This crate decides what happens when the health monitor reports a problem
//! with a spirit, and carries that decision out.
//!
//! ## Key Components
//!
//! - [`AlertClassifier`]: Pure auto-restart vs. escalate decision
//! - [`SpiritLifecycleController`]: Per-spirit state machine, one task per spirit
//! - [`AlertIntake`]: Routes alerts, operator answers and service requests
//! - [`ports`]: Side-effect traits (service control, log, notify, acknowledge, prompt)
//!
//! ## Example
//!
//! ```rust,no_run
//! use ghostpaw_health::{AlertIntake, LifecycleConfig, LifecyclePorts};
//! use ghostpaw_types::{AlertKind, HealthAlert, SpiritId};
//!
//! # async fn example() {
//! let intake = AlertIntake::new(LifecycleConfig::default(), LifecyclePorts::tracing_only());
//!
//! // Idle spirit over its memory threshold: restarted without asking anyone
//! intake
//!     .submit_alert(HealthAlert::new("alert-1", "eira", AlertKind::Memory, 91.0, 80.0, true))
//!     .unwrap();
//!
//! println!("{:?}", intake.get_spirit_state(&SpiritId::new("eira")));
//! intake.shutdown().await;
//! # }
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --auto-restart--> Restarting --done/failed--> Idle
//! Idle --escalate--> AwaitingOperator --restart--> Restarting
//!                                     --dismiss/timeout--> Idle
//! ```
//!
//! Alerts arriving while a spirit is restarting or awaiting an operator are
//! deferred and handled in order once it is idle again.

#![deny(unsafe_code)]

pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod intake;
pub mod ports;
pub mod prompts;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classifier::AlertClassifier;
pub use config::LifecycleConfig;
pub use controller::SpiritLifecycleController;
pub use error::{HealthError, HealthResult, PortError, RestartError};
pub use intake::AlertIntake;
pub use ports::{
    ActivityLog, AdminNotifier, AlertAcknowledger, HealthAlertFeed, InMemoryAcknowledger,
    LifecyclePorts, NoOpServiceControl, OperatorPrompt, ServiceControl, TracingActivityLog,
    TracingAdminNotifier,
};
pub use prompts::PendingPrompts;
