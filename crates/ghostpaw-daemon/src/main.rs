//! Ghostpaw Daemon - spirit health supervision
//!
//! Reads health alerts and operator responses as JSON lines, restarts
//! spirits that can safely be restarted and escalates the rest.

use std::path::PathBuf;

use clap::Parser;
use ghostpaw_daemon::{Daemon, DaemonConfig, DaemonResult};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ghostpaw Daemon CLI
#[derive(Parser)]
#[command(name = "ghostpawd")]
#[command(about = "Ghostpaw Daemon - spirit health supervision", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GHOSTPAW_CONFIG")]
    config: Option<String>,

    /// JSON-lines feed file (stdin when omitted)
    #[arg(short, long, env = "GHOSTPAW_FEED_PATH")]
    feed: Option<PathBuf>,

    /// Seconds an escalated alert waits for an operator
    #[arg(long, env = "GHOSTPAW_PROMPT_TIMEOUT")]
    prompt_timeout: Option<u64>,

    /// Pull alerts from the feed file once and exit
    #[arg(long)]
    drain: bool,

    /// Log level
    #[arg(long, env = "GHOSTPAW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "GHOSTPAW_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(path) = cli.feed {
        config.feed.path = Some(path);
    }
    if let Some(secs) = cli.prompt_timeout {
        config.lifecycle = config
            .lifecycle
            .with_prompt_timeout(std::time::Duration::from_secs(secs));
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        prompt_timeout_secs = config.lifecycle.prompt_timeout_secs,
        dry_run = config.service.restart_command.is_none(),
        "Starting ghostpawd"
    );

    let daemon = Daemon::new(config);
    if cli.drain {
        let submitted = daemon.drain_once().await?;
        info!(alerts = submitted, "Drain complete");
        Ok(())
    } else {
        daemon.run().await
    }
}
