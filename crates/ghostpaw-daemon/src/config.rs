//! Configuration for ghostpawd

use ghostpaw_health::LifecycleConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder replaced by the spirit id in service command templates
pub const SPIRIT_PLACEHOLDER: &str = "{spirit}";

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Lifecycle controller configuration
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Service control commands
    #[serde(default)]
    pub service: ServiceConfig,

    /// Alert feed configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shell command templates for service control.
///
/// A missing template means that action only gets logged (dry run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// e.g. `systemctl restart spirit@{spirit}`
    #[serde(default)]
    pub restart_command: Option<String>,

    #[serde(default)]
    pub start_command: Option<String>,

    #[serde(default)]
    pub stop_command: Option<String>,

    /// Seconds before a running command is killed and reported failed
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            restart_command: None,
            start_command: None,
            stop_command: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl ServiceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }
}

/// Alert feed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// JSON-lines file to read; stdin when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_command_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `GHOSTPAW_`-prefixed environment variables (`__` between sections,
    /// e.g. `GHOSTPAW_LIFECYCLE__PROMPT_TIMEOUT_SECS=60`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GHOSTPAW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
