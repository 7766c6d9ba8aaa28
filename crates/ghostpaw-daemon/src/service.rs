//! Service control backed by shell command templates

use async_trait::async_trait;
use ghostpaw_health::{RestartError, ServiceControl};
use ghostpaw_types::{ServiceAction, SpiritId};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{ServiceConfig, SPIRIT_PLACEHOLDER};

/// Runs the configured command for each service action.
///
/// Actions without a configured command are logged and reported as
/// successful.
pub struct CommandServiceControl {
    config: ServiceConfig,
}

impl CommandServiceControl {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    fn template(&self, action: ServiceAction) -> Option<&str> {
        match action {
            ServiceAction::Restart => self.config.restart_command.as_deref(),
            ServiceAction::Start => self.config.start_command.as_deref(),
            ServiceAction::Stop => self.config.stop_command.as_deref(),
        }
    }

    async fn run(&self, spirit_id: &SpiritId, action: ServiceAction) -> Result<(), RestartError> {
        let Some(template) = self.template(action) else {
            info!(spirit_id = %spirit_id, action = %action, "No command configured, dry run");
            return Ok(());
        };

        let command = render_command(template, spirit_id)
            .map_err(|reason| RestartError::new(spirit_id.clone(), action, reason))?;
        debug!(spirit_id = %spirit_id, command = %command, "Running service command");

        let output = tokio::time::timeout(
            self.config.command_timeout(),
            Command::new("sh")
                .arg("-c")
                .arg(&command)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            RestartError::new(
                spirit_id.clone(),
                action,
                format!(
                    "command timed out after {}s",
                    self.config.command_timeout().as_secs()
                ),
            )
        })?
        .map_err(|e| RestartError::new(spirit_id.clone(), action, e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            spirit_id = %spirit_id,
            action = %action,
            status = %output.status,
            "Service command failed"
        );
        Err(RestartError::new(
            spirit_id.clone(),
            action,
            format!("{}: {}", output.status, stderr.trim()),
        ))
    }
}

#[async_trait]
impl ServiceControl for CommandServiceControl {
    async fn restart_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.run(spirit_id, ServiceAction::Restart).await
    }

    async fn start_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.run(spirit_id, ServiceAction::Start).await
    }

    async fn stop_service(&self, spirit_id: &SpiritId) -> Result<(), RestartError> {
        self.run(spirit_id, ServiceAction::Stop).await
    }
}

/// Substitute the spirit id into a command template.
///
/// Ids are spliced into a shell command, so only `[A-Za-z0-9._-]` is allowed.
pub fn render_command(template: &str, spirit_id: &SpiritId) -> Result<String, String> {
    let id = spirit_id.as_str();
    let safe = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !safe {
        return Err(format!("spirit id {:?} is not safe to pass to a command", id));
    }

    Ok(template.replace(SPIRIT_PLACEHOLDER, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command() {
        let rendered = render_command(
            "systemctl restart spirit@{spirit}",
            &SpiritId::new("eira-2"),
        )
        .unwrap();
        assert_eq!(rendered, "systemctl restart spirit@eira-2");
    }

    #[test]
    fn test_render_rejects_shell_metacharacters() {
        assert!(render_command("restart {spirit}", &SpiritId::new("eira; rm -rf /")).is_err());
        assert!(render_command("restart {spirit}", &SpiritId::new("")).is_err());
    }

    #[tokio::test]
    async fn test_missing_command_is_dry_run() {
        let control = CommandServiceControl::new(ServiceConfig::default());
        assert!(control.restart_service(&SpiritId::new("eira")).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_exit_status() {
        let control = CommandServiceControl::new(ServiceConfig {
            restart_command: Some("true {spirit}".into()),
            stop_command: Some("echo cannot stop {spirit} >&2; exit 3".into()),
            ..ServiceConfig::default()
        });
        let eira = SpiritId::new("eira");

        assert!(control.restart_service(&eira).await.is_ok());

        let err = control.stop_service(&eira).await.unwrap_err();
        assert_eq!(err.action, ServiceAction::Stop);
        assert!(err.reason.contains("cannot stop eira"));
    }
}
