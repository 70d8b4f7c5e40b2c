//! Kinsta MU plugin installation:
//! Download → Verify → Extract → Upload → Validate.
//!
//! The first four stages abort the install with a stage-specific error.
//! Validate only warns.

use crate::adapters::ssh::{shell_quote, SshClient};
use crate::config::{join_remote, DeployConfig};
use crate::core::workspace::Workspace;
use crate::domain::model::{ExcludePatternList, StepOutcome};
use crate::domain::ports::{RemoteSynchronizer, SyncRequest};
use crate::utils::error::{DeployError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

const ARCHIVE_CONTENT_TYPES: [&str; 6] = [
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
    "application/octet-stream",
    "binary/octet-stream",
    "application/force-download",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStage {
    Download,
    Verify,
    Extract,
    Upload,
    Validate,
}

impl fmt::Display for PluginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Download => "download",
            Self::Verify => "verify",
            Self::Extract => "extract",
            Self::Upload => "upload",
            Self::Validate => "validate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadedArchive {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct PluginInstaller {
    client: Client,
    synchronizer: Arc<dyn RemoteSynchronizer>,
    ssh: SshClient,
}

impl PluginInstaller {
    pub fn new(client: Client, synchronizer: Arc<dyn RemoteSynchronizer>, ssh: SshClient) -> Self {
        Self {
            client,
            synchronizer,
            ssh,
        }
    }

    pub async fn install(&self, config: &DeployConfig, workspace: &Workspace) -> Result<StepOutcome> {
        tracing::info!("🧩 Installing Kinsta MU plugin from {}", config.mu_plugin_url);

        tracing::debug!("Plugin stage: {}", PluginStage::Download);
        let archive = self.download(&config.mu_plugin_url).await?;
        fs::write(workspace.plugin_archive(), &archive.bytes)?;

        tracing::debug!("Plugin stage: {}", PluginStage::Verify);
        verify_archive(&archive)?;

        tracing::debug!("Plugin stage: {}", PluginStage::Extract);
        let extract_dir = workspace.plugin_extract_dir();
        let entries = extract_archive(&archive.bytes, &extract_dir)?;
        tracing::info!("📦 Extracted {} top-level entries", entries.len());

        let remote_dir = config.remote_plugin_dir();
        if config.dry_run {
            tracing::info!("🔍 Dry run: would upload MU plugin to {}", remote_dir);
            return Ok(StepOutcome::Skipped(
                "dry run: plugin downloaded and verified, upload skipped".to_string(),
            ));
        }

        tracing::debug!("Plugin stage: {}", PluginStage::Upload);
        self.upload(&extract_dir, &remote_dir).await?;

        tracing::debug!("Plugin stage: {}", PluginStage::Validate);
        if let Some(entry) = entries.first() {
            self.validate(&remote_dir, entry).await;
        }

        tracing::info!("✅ Kinsta MU plugin installed to {}", remote_dir);
        Ok(StepOutcome::Succeeded)
    }

    pub async fn download(&self, url: &str) -> Result<DownloadedArchive> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DeployError::PluginDownloadError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::PluginDownloadError {
                message: format!("{} returned HTTP {}", url, status),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DeployError::PluginDownloadError {
                message: e.to_string(),
            })?;

        tracing::debug!(
            "Downloaded {} bytes ({})",
            bytes.len(),
            content_type.as_deref().unwrap_or("no content type")
        );
        Ok(DownloadedArchive {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn upload(&self, extract_dir: &Path, remote_dir: &str) -> Result<()> {
        let excludes = ExcludePatternList::default();
        let request = SyncRequest {
            local_dir: extract_dir,
            remote_dir,
            excludes: &excludes,
            delete: false,
            dry_run: false,
        };

        let output = self
            .synchronizer
            .mirror(&request)
            .await
            .map_err(|e| DeployError::PluginUploadError {
                message: e.to_string(),
            })?;
        if !output.success() {
            return Err(DeployError::PluginUploadError {
                message: format!(
                    "{} exited with {:?}: {}",
                    self.synchronizer.kind(),
                    output.code,
                    output.stderr.trim()
                ),
            });
        }
        Ok(())
    }

    async fn validate(&self, remote_dir: &str, entry: &str) {
        let remote_path = join_remote(remote_dir, entry);
        let check = format!("test -e {}", shell_quote(&remote_path));
        match self.ssh.exec(&check).await {
            Ok(output) if output.success() => {
                tracing::debug!("Found {} on the server", remote_path);
            }
            Ok(_) => tracing::warn!("⚠️ Uploaded plugin not found at {}", remote_path),
            Err(e) => tracing::warn!("⚠️ Could not validate plugin upload: {}", e),
        }
    }
}

/// Rejects anything that is not a zip archive, by declared type and by magic bytes.
pub fn verify_archive(archive: &DownloadedArchive) -> Result<()> {
    if let Some(content_type) = &archive.content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !ARCHIVE_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(DeployError::PluginVerifyError {
                message: format!("unexpected content type '{}'", content_type),
            });
        }
    }

    if !archive.bytes.starts_with(ZIP_MAGIC) {
        return Err(DeployError::PluginVerifyError {
            message: "payload does not start with a zip header".to_string(),
        });
    }
    Ok(())
}

/// Extracts into `dest` and returns the archive's top-level entry names in order.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        DeployError::PluginExtractError {
            message: e.to_string(),
        }
    })?;
    if archive.len() == 0 {
        return Err(DeployError::PluginExtractError {
            message: "archive is empty".to_string(),
        });
    }

    let mut entries: Vec<String> = Vec::new();
    for name in archive.file_names() {
        let top = name.split('/').next().unwrap_or_default();
        if top.is_empty() || top == "__MACOSX" {
            continue;
        }
        if !entries.iter().any(|e| e == top) {
            entries.push(top.to_string());
        }
    }

    fs::create_dir_all(dest)?;
    archive
        .extract(dest)
        .map_err(|e| DeployError::PluginExtractError {
            message: e.to_string(),
        })?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file::<_, ()>(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_verify_accepts_zip() {
        let archive = DownloadedArchive {
            bytes: zip_bytes(&[("kinsta-mu-plugins.php", "<?php")]),
            content_type: Some("application/zip".to_string()),
        };
        assert!(verify_archive(&archive).is_ok());

        let untyped = DownloadedArchive {
            content_type: None,
            ..archive
        };
        assert!(verify_archive(&untyped).is_ok());
    }

    #[test]
    fn test_verify_rejects_html_content_type() {
        let archive = DownloadedArchive {
            bytes: zip_bytes(&[("a.php", "<?php")]),
            content_type: Some("text/html; charset=UTF-8".to_string()),
        };
        assert!(matches!(
            verify_archive(&archive),
            Err(DeployError::PluginVerifyError { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_non_zip_bytes() {
        let archive = DownloadedArchive {
            bytes: b"<html>Not found</html>".to_vec(),
            content_type: Some("application/octet-stream".to_string()),
        };
        assert!(matches!(
            verify_archive(&archive),
            Err(DeployError::PluginVerifyError { .. })
        ));
    }

    #[test]
    fn test_extract_lists_top_level_entries() {
        let dir = TempDir::new().unwrap();
        let bytes = zip_bytes(&[
            ("kinsta-mu-plugins.php", "<?php // loader"),
            ("kinsta-mu-plugins/cache/cache.php", "<?php"),
            ("kinsta-mu-plugins/shared/helpers.php", "<?php"),
        ]);

        let mut entries = extract_archive(&bytes, dir.path()).unwrap();
        entries.sort();

        assert_eq!(entries, vec!["kinsta-mu-plugins", "kinsta-mu-plugins.php"]);
        assert!(dir.path().join("kinsta-mu-plugins.php").is_file());
        assert!(dir.path().join("kinsta-mu-plugins/shared/helpers.php").is_file());
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            extract_archive(b"PK\x03\x04 truncated", dir.path()),
            Err(DeployError::PluginExtractError { .. })
        ));
    }
}
