//! JSON-lines intake feed
//!
//! Each non-empty line is one message from the monitor or the dashboard:
//!
//! ```text
//! {"type":"alert","id":"a1","spirit_id":"eira","kind":"memory","value":91.0,"threshold":80.0,"spirit_idle":true}
//! {"type":"operator_response","alert_id":"a2","decision":"restart"}
//! ```
//!
//! Lines starting with `#` are comments.

use std::path::PathBuf;

use async_trait::async_trait;
use ghostpaw_control::{GhostpawControlPlane, RequestContext};
use ghostpaw_health::{HealthAlertFeed, HealthError, HealthResult};
use ghostpaw_types::{HealthAlert, OperatorResponse};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::error::{DaemonError, DaemonResult};

/// One line of the intake feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeMessage {
    Alert(HealthAlert),
    OperatorResponse(OperatorResponse),
}

/// Parse one feed line. Blank lines and comments yield `None`.
pub fn parse_line(line: &str) -> DaemonResult<Option<IntakeMessage>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| DaemonError::Feed(format!("{}: {}", e, line)))
}

/// Counters for a processed feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub alerts: usize,
    pub responses: usize,
    pub rejected: usize,
}

/// Read messages until end of input and hand each to the control plane.
///
/// Malformed lines are logged and skipped. Operator responses are submitted
/// with `responder`'s role.
pub async fn run_feed<R>(
    reader: R,
    control_plane: &GhostpawControlPlane,
    responder: &RequestContext,
) -> DaemonResult<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "Skipping malformed feed line");
                stats.rejected += 1;
                continue;
            }
        };

        match message {
            IntakeMessage::Alert(alert) => {
                debug!(alert_id = %alert.id, spirit_id = %alert.spirit_id, "Alert from feed");
                control_plane
                    .submit_alert(alert)
                    .map_err(|e| DaemonError::Feed(e.to_string()))?;
                stats.alerts += 1;
            }
            IntakeMessage::OperatorResponse(response) => {
                match control_plane.submit_operator_response(response, responder) {
                    Ok(true) => stats.responses += 1,
                    Ok(false) => stats.rejected += 1,
                    Err(e) => {
                        warn!(error = %e, "Operator response rejected");
                        stats.rejected += 1;
                    }
                }
            }
        }
    }

    Ok(stats)
}

/// Pull feed over a JSON-lines file; operator responses in it are ignored.
pub struct JsonLinesAlertFeed {
    path: PathBuf,
}

impl JsonLinesAlertFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HealthAlertFeed for JsonLinesAlertFeed {
    async fn get_health_alerts(&self) -> HealthResult<Vec<HealthAlert>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| HealthError::Feed(format!("{}: {}", self.path.display(), e)))?;

        let mut alerts = Vec::new();
        for line in contents.lines() {
            match parse_line(line) {
                Ok(Some(IntakeMessage::Alert(alert))) => alerts.push(alert),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping malformed feed line"),
            }
        }
        Ok(alerts)
    }
}
