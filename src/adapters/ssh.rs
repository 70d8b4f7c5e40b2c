use crate::domain::model::RemoteTarget;
use crate::domain::ports::{CommandOutput, CommandRunner, CommandSpec};
use crate::utils::error::{DeployError, Result};
use std::sync::Arc;

/// Options shared by every ssh invocation. Kinsta hosts rotate keys, so host
/// keys are not pinned.
pub const SSH_OPTIONS: [&str; 8] = [
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
    "-o",
    "ConnectTimeout=30",
    "-o",
    "LogLevel=ERROR",
];

pub const SSHPASS_ENV: &str = "SSHPASS";

/// Wraps a value in single quotes for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Runs single commands on the remote host through `sshpass -e ssh`.
#[derive(Clone)]
pub struct SshClient {
    target: RemoteTarget,
    runner: Arc<dyn CommandRunner>,
}

impl SshClient {
    pub fn new(target: RemoteTarget, runner: Arc<dyn CommandRunner>) -> Self {
        Self { target, runner }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// The `-e` transport string handed to rsync.
    pub fn transport_command(&self) -> String {
        format!("ssh -p {} {}", self.target.port, SSH_OPTIONS.join(" "))
    }

    pub fn command_spec(&self, remote_command: &str) -> CommandSpec {
        CommandSpec::new("sshpass")
            .arg("-e")
            .arg("ssh")
            .args(["-p".to_string(), self.target.port.to_string()])
            .args(SSH_OPTIONS)
            .arg(self.target.user_at_host())
            .arg(remote_command)
            .env(SSHPASS_ENV, self.target.password.clone())
    }

    pub async fn exec(&self, remote_command: &str) -> Result<CommandOutput> {
        tracing::debug!("ssh {}: {}", self.target.user_at_host(), remote_command);
        self.runner.run(&self.command_spec(remote_command)).await
    }

    pub async fn check_connection(&self) -> Result<()> {
        let output = self.exec("echo connected").await?;
        if output.success() {
            Ok(())
        } else {
            Err(DeployError::ConnectivityError {
                host: self.target.host.clone(),
                port: self.target.port,
                message: first_line_or_code(&output),
            })
        }
    }
}

pub(crate) fn first_line_or_code(output: &CommandOutput) -> String {
    output
        .stderr
        .lines()
        .chain(output.stdout.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("exit status {:?}", output.code))
}
