//! Daemon lifecycle: wiring, event logging and graceful shutdown

use std::sync::Arc;

use ghostpaw_control::{GhostpawControlPlane, RequestContext};
use ghostpaw_health::{
    AlertIntake, HealthAlertFeed, InMemoryAcknowledger, LifecyclePorts, TracingActivityLog,
    TracingAdminNotifier,
};
use ghostpaw_types::{EventSeverity, LifecycleEventEnvelope};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::feed::{run_feed, FeedStats, JsonLinesAlertFeed};
use crate::service::CommandServiceControl;

/// Running daemon state
pub struct Daemon {
    config: DaemonConfig,
    intake: Arc<AlertIntake>,
    control_plane: GhostpawControlPlane,
    event_logger: JoinHandle<()>,
}

impl Daemon {
    /// Wire the production ports from configuration.
    pub fn new(config: DaemonConfig) -> Self {
        let ports = LifecyclePorts::new(
            Arc::new(CommandServiceControl::new(config.service.clone())),
            Arc::new(TracingActivityLog),
            Arc::new(TracingAdminNotifier),
            Arc::new(InMemoryAcknowledger::new()),
        );
        Self::with_ports(config, ports)
    }

    pub fn with_ports(config: DaemonConfig, ports: LifecyclePorts) -> Self {
        let intake = Arc::new(AlertIntake::new(config.lifecycle.clone(), ports));
        let control_plane = GhostpawControlPlane::new(intake.clone());
        let event_logger = tokio::spawn(log_events(intake.subscribe()));

        Self {
            config,
            intake,
            control_plane,
            event_logger,
        }
    }

    pub fn control_plane(&self) -> &GhostpawControlPlane {
        &self.control_plane
    }

    /// Serve the configured feed (file or stdin) until it ends or a
    /// shutdown signal arrives, then drain every spirit's queue.
    pub async fn run(self) -> DaemonResult<()> {
        let result = match self.config.feed.path.clone() {
            Some(path) => {
                info!(path = %path.display(), "Reading intake feed from file");
                let file = tokio::fs::File::open(&path).await?;
                self.serve(BufReader::new(file)).await
            }
            None => {
                info!("Reading intake feed from stdin");
                self.serve(BufReader::new(tokio::io::stdin())).await
            }
        };

        self.shutdown().await;
        result
    }

    /// Pull every alert from the configured file once, then shut down.
    pub async fn drain_once(self) -> DaemonResult<usize> {
        let result = match self.config.feed.path.clone() {
            Some(path) => {
                let feed = JsonLinesAlertFeed::new(path);
                self.drain(&feed).await
            }
            None => Err(DaemonError::Config(
                "draining requires a feed file".to_string(),
            )),
        };

        self.shutdown().await;
        result
    }

    async fn drain(&self, feed: &dyn HealthAlertFeed) -> DaemonResult<usize> {
        let submitted = self.intake.drain_feed(feed).await?;
        info!(alerts = submitted, "Feed drained");
        Ok(submitted)
    }

    async fn serve<R>(&self, reader: R) -> DaemonResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let responder = RequestContext::system("dashboard-feed");

        tokio::select! {
            stats = run_feed(reader, &self.control_plane, &responder) => {
                let stats: FeedStats = stats?;
                info!(
                    alerts = stats.alerts,
                    responses = stats.responses,
                    rejected = stats.rejected,
                    "Intake feed ended"
                );
            }
            _ = shutdown_signal() => {}
        }

        Ok(())
    }

    /// Let queued work finish, then stop the event logger.
    pub async fn shutdown(self) {
        info!("Waiting for queued spirit work to finish");
        self.intake.shutdown().await;
        self.event_logger.abort();
    }
}

/// Mirror lifecycle events into the log at their own severity.
async fn log_events(mut events: broadcast::Receiver<LifecycleEventEnvelope>) {
    loop {
        match events.recv().await {
            Ok(envelope) => {
                let spirit_id = envelope.spirit_id.as_str();
                let event = &envelope.event;
                match envelope.severity {
                    EventSeverity::Debug => debug!(spirit_id, ?event, "Lifecycle event"),
                    EventSeverity::Info => info!(spirit_id, ?event, "Lifecycle event"),
                    EventSeverity::Warning => warn!(spirit_id, ?event, "Lifecycle event"),
                    EventSeverity::Error => error!(spirit_id, ?event, "Lifecycle event"),
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged = n, "Event logger lagged behind lifecycle events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
