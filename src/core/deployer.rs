use crate::adapters::command::SystemCommandRunner;
use crate::adapters::lftp::LftpSynchronizer;
use crate::adapters::rsync::RsyncSynchronizer;
use crate::adapters::ssh::SshClient;
use crate::config::DeployConfig;
use crate::core::cache::CachePurger;
use crate::core::plugin::PluginInstaller;
use crate::core::stats::{append_github_output, directory_usage, extract_stats, write_stats_file};
use crate::core::workspace::Workspace;
use crate::domain::model::{DeploymentReport, StepOutcome, TransferStats, TransportKind};
use crate::domain::ports::{CommandRunner, RemoteSynchronizer, SyncRequest};
use crate::utils::error::{DeployError, Result};
use reqwest::Client;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs one deployment: transfer, optional plugin install, optional cache purge.
pub struct Deployer {
    config: DeployConfig,
    synchronizer: Arc<dyn RemoteSynchronizer>,
    plugin_installer: PluginInstaller,
    cache_purger: CachePurger,
    workspace: Workspace,
}

impl Deployer {
    pub fn new(config: DeployConfig) -> Result<Self> {
        let runner = Arc::new(SystemCommandRunner::new(config.verbose));
        Self::with_runner(config, runner)
    }

    /// Builds the deployer around any command runner; the configured transport
    /// decides which synchronizer is used.
    pub fn with_runner(config: DeployConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let workspace = Workspace::new()?;
        let ssh = SshClient::new(config.remote.clone(), runner.clone());

        let synchronizer: Arc<dyn RemoteSynchronizer> = match config.transport {
            TransportKind::Rsync => Arc::new(RsyncSynchronizer::new(ssh.clone())?),
            TransportKind::Lftp => Arc::new(LftpSynchronizer::new(
                config.remote.clone(),
                runner,
                workspace.scripts_dir(),
            )?),
        };

        let http = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;

        Ok(Self {
            plugin_installer: PluginInstaller::new(http, synchronizer.clone(), ssh.clone()),
            cache_purger: CachePurger::new(ssh, synchronizer.clone()),
            synchronizer,
            config,
            workspace,
        })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self) -> Result<DeploymentReport> {
        let started = Instant::now();
        let config = &self.config;

        tracing::info!(
            "🚀 Deploying {} to {}:{}{} via {}",
            config.source_path.display(),
            config.remote.host,
            config.remote.port,
            config.target_path,
            config.transport
        );
        if config.dry_run {
            tracing::info!("🔍 DRY RUN MODE - no changes will be made on the server");
        }

        self.check_source()?;

        tracing::info!("🔌 Testing connection");
        self.synchronizer.check_connection().await?;
        tracing::info!("✅ Connection established");

        let mut stats = self.transfer().await?;
        tracing::info!(
            "📊 {} files, {} bytes{}",
            stats.files,
            stats.bytes,
            if stats.estimated { " (estimated)" } else { "" }
        );

        let plugin = if config.install_mu_plugin {
            match self.plugin_installer.install(config, &self.workspace).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("⚠️ MU plugin installation failed: {}", e);
                    tracing::warn!("💡 {}", e.recovery_suggestion());
                    StepOutcome::Degraded(e.to_string())
                }
            }
        } else {
            tracing::info!("⏭️ MU plugin installation disabled");
            StepOutcome::Skipped("disabled".to_string())
        };

        let cache = if config.purge_cache {
            self.cache_purger.purge(config, &self.workspace).await
        } else {
            tracing::info!("⏭️ Cache purge disabled");
            StepOutcome::Skipped("disabled".to_string())
        };

        stats.elapsed_secs = started.elapsed().as_secs();
        self.publish_stats(&stats);

        tracing::info!("🎉 Deployment finished in {}s", stats.elapsed_secs);
        Ok(DeploymentReport {
            transport: self.synchronizer.kind(),
            dry_run: config.dry_run,
            stats,
            plugin,
            cache,
        })
    }

    fn check_source(&self) -> Result<()> {
        let source = self.config.source_dir();
        if source.is_dir() {
            Ok(())
        } else {
            Err(DeployError::SourceNotFound {
                path: source.display().to_string(),
            })
        }
    }

    async fn transfer(&self) -> Result<TransferStats> {
        let config = &self.config;
        let request = SyncRequest {
            local_dir: config.source_dir(),
            remote_dir: &config.target_path,
            excludes: &config.exclude_patterns,
            delete: true,
            dry_run: config.dry_run,
        };

        let output = self.synchronizer.mirror(&request).await?;
        let log_path = self.workspace.transfer_log();
        fs::write(&log_path, output.combined())?;
        tracing::debug!("Transfer log written to {}", log_path.display());

        if !output.success() {
            let err = DeployError::TransferError {
                tool: self.synchronizer.kind().to_string(),
                code: output.code,
            };
            if !config.dry_run {
                return Err(err);
            }
            tracing::warn!("⚠️ Dry run reported an error ({}); no changes were made", err);
        }

        if config.dry_run {
            let usage = directory_usage(config.source_dir())?;
            return Ok(TransferStats {
                files: 0,
                bytes: usage.bytes,
                elapsed_secs: 0,
                estimated: true,
            });
        }

        let log_text = fs::read_to_string(&log_path)?;
        let extracted = extract_stats(&log_text, self.synchronizer.stats_patterns(), config.source_dir())?;
        Ok(extracted.into_transfer_stats(0))
    }

    /// Stats are advisory; failing to write them never fails the deployment.
    fn publish_stats(&self, stats: &TransferStats) {
        match write_stats_file(&self.config.stats_file, stats) {
            Ok(()) => tracing::debug!("Stats written to {}", self.config.stats_file.display()),
            Err(e) => tracing::warn!(
                "⚠️ Could not write stats file {}: {}",
                self.config.stats_file.display(),
                e
            ),
        }

        if let Some(path) = &self.config.github_output {
            if let Err(e) = append_github_output(path, stats) {
                tracing::warn!("⚠️ Could not write GitHub outputs to {}: {}", path.display(), e);
            }
        }
    }
}
