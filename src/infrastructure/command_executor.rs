//! Failover command dispatch through `docker exec`

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::config::CommandConfig;
use crate::core::cluster::{CommandExecutor, CommandOutput, FailoverCommand, ServiceKind};
use crate::error::{AppError, Result};

/// Runs the Hadoop HA admin tools inside the daemon containers
pub struct DockerExecCommandExecutor {
    config: CommandConfig,
}

impl DockerExecCommandExecutor {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    fn args(&self, command: &FailoverCommand) -> Vec<String> {
        let (container, binary, admin) = match command.service {
            ServiceKind::NameNode => (
                &self.config.namenode_container,
                &self.config.hdfs_binary,
                "haadmin",
            ),
            ServiceKind::ResourceManager => (
                &self.config.resourcemanager_container,
                &self.config.yarn_binary,
                "rmadmin",
            ),
        };

        let mut args = vec![
            "exec".to_string(),
            container.clone(),
            binary.clone(),
            admin.to_string(),
            "-failover".to_string(),
        ];
        if command.force {
            args.push("--forcemanual".to_string());
        }
        args.push(command.from.clone());
        args.push(command.to.clone());
        args
    }
}

#[async_trait]
impl CommandExecutor for DockerExecCommandExecutor {
    fn render(&self, command: &FailoverCommand) -> String {
        format!("{} {}", self.config.docker_binary, self.args(command).join(" "))
    }

    async fn execute_failover(&self, command: &FailoverCommand) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.config.docker_binary);
        cmd.args(self.args(command))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let limit = Duration::from_secs(self.config.timeout_seconds);
        let output = timeout(limit, cmd.output())
            .await
            .map_err(|_| {
                AppError::CommandError(format!(
                    "Failover command timed out after {}s",
                    self.config.timeout_seconds
                ))
            })?
            .map_err(|e| AppError::CommandError(format!("Failed to spawn process: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            debug!(service = %command.service, stdout = %stdout, "Failover command succeeded");
            return Ok(CommandOutput {
                success: true,
                output: stdout,
                error: None,
            });
        }

        let exit_code = output.status.code().unwrap_or(-1);
        error!(
            service = %command.service,
            exit_code = exit_code,
            stderr = %stderr,
            "Failover command exited with an error"
        );

        Ok(CommandOutput {
            success: false,
            output: stdout,
            error: Some(if stderr.is_empty() {
                format!("Command exited with status {}", exit_code)
            } else {
                stderr
            }),
        })
    }
}
