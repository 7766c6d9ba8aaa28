//! Ghostpaw daemon library
//!
//! This module provides the pieces `ghostpawd` is built from:
//! - Layered configuration
//! - Command-backed service control
//! - JSON-lines intake feed for alerts and operator responses
//! - Daemon wiring and graceful shutdown

pub mod config;
pub mod daemon;
pub mod error;
pub mod feed;
pub mod service;

pub use config::DaemonConfig;
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use feed::{IntakeMessage, JsonLinesAlertFeed};
pub use service::CommandServiceControl;
