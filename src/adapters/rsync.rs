use crate::adapters::ssh::{SshClient, SSHPASS_ENV};
use crate::domain::model::TransportKind;
use crate::domain::patterns::StatsPatterns;
use crate::domain::ports::{CommandOutput, CommandSpec, RemoteSynchronizer, SyncRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// rsync's own I/O timeout in seconds.
pub const RSYNC_IO_TIMEOUT_SECS: u32 = 300;

/// Delta transfer with `rsync` over ssh. Files are compared by size and mtime.
pub struct RsyncSynchronizer {
    ssh: SshClient,
    patterns: StatsPatterns,
}

impl RsyncSynchronizer {
    pub fn new(ssh: SshClient) -> Result<Self> {
        Ok(Self {
            ssh,
            patterns: StatsPatterns::rsync()?,
        })
    }

    pub fn build_command(&self, request: &SyncRequest<'_>) -> CommandSpec {
        let target = self.ssh.target();
        let mut spec = CommandSpec::new("sshpass")
            .args(["-e", "rsync", "-az", "--stats", "--itemize-changes"])
            .arg(format!("--timeout={}", RSYNC_IO_TIMEOUT_SECS));

        if request.delete {
            spec = spec.arg("--delete");
        }
        if request.dry_run {
            spec = spec.arg("--dry-run");
        }

        spec.args(request.excludes.rsync_flags())
            .arg("-e")
            .arg(self.ssh.transport_command())
            .arg(format!("{}/", request.local_dir.display().to_string().trim_end_matches('/')))
            .arg(format!(
                "{}:{}/",
                target.user_at_host(),
                request.remote_dir.trim_end_matches('/')
            ))
            .env(SSHPASS_ENV, target.password.clone())
    }
}

#[async_trait]
impl RemoteSynchronizer for RsyncSynchronizer {
    fn kind(&self) -> TransportKind {
        TransportKind::Rsync
    }

    fn stats_patterns(&self) -> &StatsPatterns {
        &self.patterns
    }

    async fn check_connection(&self) -> Result<()> {
        self.ssh.check_connection().await
    }

    async fn mirror(&self, request: &SyncRequest<'_>) -> Result<CommandOutput> {
        let spec = self.build_command(request);
        tracing::info!(
            "📤 rsync {} → {}{}",
            request.local_dir.display(),
            request.remote_dir,
            if request.dry_run { " (dry run)" } else { "" }
        );
        self.ssh.runner().run(&spec).await
    }
}
