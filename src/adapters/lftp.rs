use crate::adapters::ssh::{first_line_or_code, SSH_OPTIONS};
use crate::domain::model::{RemoteTarget, TransportKind};
use crate::domain::patterns::StatsPatterns;
use crate::domain::ports::{CommandOutput, CommandRunner, CommandSpec, RemoteSynchronizer, SyncRequest};
use crate::utils::error::{DeployError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MIRROR_PARALLEL_CONNECTIONS: usize = 4;

/// Quotes a word for lftp's command parser.
pub fn lftp_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// SFTP mirroring through a scripted `lftp` session. Only newer files are
/// uploaded; remote files are never deleted.
pub struct LftpSynchronizer {
    target: RemoteTarget,
    runner: Arc<dyn CommandRunner>,
    script_dir: PathBuf,
    patterns: StatsPatterns,
    script_seq: AtomicUsize,
}

impl LftpSynchronizer {
    pub fn new(target: RemoteTarget, runner: Arc<dyn CommandRunner>, script_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            target,
            runner,
            script_dir,
            patterns: StatsPatterns::lftp()?,
            script_seq: AtomicUsize::new(0),
        })
    }

    fn session_preamble(&self) -> String {
        let connect_program = format!("ssh -a -x {}", SSH_OPTIONS.join(" "));
        [
            "set cmd:fail-exit yes".to_string(),
            "set net:timeout 30".to_string(),
            "set net:max-retries 3".to_string(),
            "set net:reconnect-interval-base 5".to_string(),
            "set sftp:auto-confirm yes".to_string(),
            format!("set sftp:connect-program {}", lftp_quote(&connect_program)),
            format!(
                "open -p {} {}",
                self.target.port,
                lftp_quote(&format!("sftp://{}", self.target.host))
            ),
            format!(
                "user {} {}",
                lftp_quote(&self.target.username),
                lftp_quote(&self.target.password)
            ),
        ]
        .join("\n")
    }

    pub fn connection_script(&self) -> String {
        format!("{}\ncls -1\nbye\n", self.session_preamble())
    }

    pub fn mirror_script(&self, request: &SyncRequest<'_>) -> String {
        let mut words = vec![
            "mirror".to_string(),
            "--reverse".to_string(),
            "--only-newer".to_string(),
            format!("--parallel={}", MIRROR_PARALLEL_CONNECTIONS),
            "--verbose".to_string(),
        ];
        if request.dry_run {
            words.push("--dry-run".to_string());
        }
        words.extend(request.excludes.lftp_flags().iter().map(|f| lftp_quote(f)));
        words.push(lftp_quote(&request.local_dir.display().to_string()));
        words.push(lftp_quote(request.remote_dir));

        format!("{}\n{}\nbye\n", self.session_preamble(), words.join(" "))
    }

    /// Scripts hold the password, so they are only readable by the owner.
    fn write_script(&self, name: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.script_dir)?;
        let seq = self.script_seq.fetch_add(1, Ordering::Relaxed);
        let path = self.script_dir.join(format!("{}-{}.lftp", name, seq));
        write_private(&path, content)?;
        Ok(path)
    }

    async fn run_script(&self, name: &str, content: &str) -> Result<CommandOutput> {
        let path = self.write_script(name, content)?;
        let spec = CommandSpec::new("lftp")
            .arg("-f")
            .arg(path.display().to_string());
        let output = self.runner.run(&spec).await;
        if let Err(e) = fs::remove_file(&path) {
            tracing::debug!("Could not remove lftp script {}: {}", path.display(), e);
        }
        output
    }
}

#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}

#[async_trait]
impl RemoteSynchronizer for LftpSynchronizer {
    fn kind(&self) -> TransportKind {
        TransportKind::Lftp
    }

    fn stats_patterns(&self) -> &StatsPatterns {
        &self.patterns
    }

    async fn check_connection(&self) -> Result<()> {
        let output = self.run_script("check", &self.connection_script()).await?;
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

    async fn mirror(&self, request: &SyncRequest<'_>) -> Result<CommandOutput> {
        if request.delete {
            tracing::debug!("lftp mirror keeps remote files that are missing locally");
        }
        tracing::info!(
            "📤 lftp mirror {} → {}{}",
            request.local_dir.display(),
            request.remote_dir,
            if request.dry_run { " (dry run)" } else { "" }
        );
        self.run_script("mirror", &self.mirror_script(request)).await
    }
}
