//! Runs external tools with `tokio::process`, streaming their output into the log.

use crate::domain::ports::{CommandOutput, CommandRunner, CommandSpec};
use crate::utils::error::{DeployError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    /// Echo every output line at info level instead of debug.
    echo_output: bool,
}

impl SystemCommandRunner {
    pub fn new(echo_output: bool) -> Self {
        Self { echo_output }
    }
}

/// Reads until EOF whatever the bytes are; a reader that stops early closes the
/// pipe under a child that is still writing.
fn collect_lines<R>(reader: R, stream: &'static str, echo: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = String::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("[{}] read error: {}", stream, e);
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if echo {
                tracing::info!("[{}] {}", stream, line);
            } else {
                tracing::debug!("[{}] {}", stream, line);
            }
            collected.push_str(line);
            collected.push('\n');
        }
        collected
    })
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", spec.display());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        if let Some(dir) = &spec.work_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| DeployError::CommandSpawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| collect_lines(out, "stdout", self.echo_output));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| collect_lines(err, "stderr", self.echo_output));

        let status = child.wait().await?;

        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        tracing::debug!("{} finished with {:?}", spec.program, status.code());
        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}
