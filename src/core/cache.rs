//! Remote cache purge over ssh, with a manual-run script as fallback.
//!
//! Success is detected from the command's text output, so a run without a
//! confirmation word is reported as degraded rather than failed.

use crate::adapters::ssh::{first_line_or_code, shell_quote, SshClient};
use crate::config::{join_remote, DeployConfig};
use crate::core::workspace::Workspace;
use crate::domain::model::{ExcludePatternList, StepOutcome};
use crate::domain::ports::{CommandOutput, RemoteSynchronizer, SyncRequest};
use crate::utils::error::{DeployError, Result};
use std::fs;
use std::sync::Arc;

pub const PURGE_COMMAND: &str = "wp kinsta cache purge --all";
pub const FALLBACK_SCRIPT_NAME: &str = ".kinsta-purge-cache.sh";

const CONFIRMATION_WORDS: [&str; 4] = ["success", "purged", "cleared", "flushed"];

pub fn purge_confirmed(output: &str) -> bool {
    let lower = output.to_lowercase();
    CONFIRMATION_WORDS.iter().any(|word| lower.contains(word))
}

pub fn remote_purge_command(target_path: &str) -> String {
    format!("cd {} && {}", shell_quote(target_path), PURGE_COMMAND)
}

pub fn fallback_script(target_path: &str) -> String {
    format!(
        "#!/bin/sh\n# Purge the Kinsta cache for this site, then delete this file.\nset -e\n{}\n",
        remote_purge_command(target_path)
    )
}

pub struct CachePurger {
    ssh: SshClient,
    synchronizer: Arc<dyn RemoteSynchronizer>,
}

impl CachePurger {
    pub fn new(ssh: SshClient, synchronizer: Arc<dyn RemoteSynchronizer>) -> Self {
        Self { ssh, synchronizer }
    }

    pub async fn purge(&self, config: &DeployConfig, workspace: &Workspace) -> StepOutcome {
        if config.dry_run {
            tracing::info!("🔍 Dry run: skipping cache purge");
            return StepOutcome::Skipped("dry run".to_string());
        }

        tracing::info!("🧹 Purging Kinsta cache");
        match self.run_remote(&config.target_path).await {
            Ok(output) if purge_confirmed(&output.stdout) => {
                tracing::info!("✅ Cache purged");
                StepOutcome::Succeeded
            }
            Ok(output) => {
                tracing::warn!(
                    "⚠️ Cache purge ran but did not confirm success: {}",
                    output.stdout.trim()
                );
                StepOutcome::Degraded("purge command gave no confirmation".to_string())
            }
            Err(e) => {
                tracing::warn!("⚠️ Cache purge over ssh failed: {}", e);
                self.upload_fallback(config, workspace).await
            }
        }
    }

    async fn run_remote(&self, target_path: &str) -> Result<CommandOutput> {
        self.ssh.check_connection().await?;

        let output = self.ssh.exec(&remote_purge_command(target_path)).await?;
        if !output.success() {
            return Err(DeployError::CachePurgeError {
                message: first_line_or_code(&output),
            });
        }
        Ok(output)
    }

    async fn upload_fallback(&self, config: &DeployConfig, workspace: &Workspace) -> StepOutcome {
        let remote_script = join_remote(&config.target_path, FALLBACK_SCRIPT_NAME);
        match self.try_upload_fallback(config, workspace).await {
            Ok(()) => {
                tracing::warn!(
                    "⚠️ Uploaded {}; run it on the server to purge the cache: sh {}",
                    FALLBACK_SCRIPT_NAME,
                    remote_script
                );
                StepOutcome::Degraded(format!(
                    "cache not purged; run {} manually",
                    remote_script
                ))
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not upload cache purge script: {}", e);
                StepOutcome::Degraded(format!("cache not purged: {}", e))
            }
        }
    }

    async fn try_upload_fallback(&self, config: &DeployConfig, workspace: &Workspace) -> Result<()> {
        let dir = workspace.purge_upload_dir();
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(FALLBACK_SCRIPT_NAME), fallback_script(&config.target_path))?;

        let excludes = ExcludePatternList::default();
        let request = SyncRequest {
            local_dir: &dir,
            remote_dir: &config.target_path,
            excludes: &excludes,
            delete: false,
            dry_run: false,
        };
        let output = self.synchronizer.mirror(&request).await?;
        if !output.success() {
            return Err(DeployError::CachePurgeError {
                message: format!("script upload failed: {}", first_line_or_code(&output)),
            });
        }
        Ok(())
    }
}
