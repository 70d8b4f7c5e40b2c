use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-run scratch directory. Everything in it is removed when this is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("kinsta-deploy-").tempdir()?;
        tracing::debug!("Scratch workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn transfer_log(&self) -> PathBuf {
        self.path().join("transfer.log")
    }

    pub fn plugin_archive(&self) -> PathBuf {
        self.path().join("kinsta-mu-plugins.zip")
    }

    pub fn plugin_extract_dir(&self) -> PathBuf {
        self.path().join("mu-plugin")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.path().join("scripts")
    }

    pub fn purge_upload_dir(&self) -> PathBuf {
        self.path().join("cache-purge")
    }
}
