//! Best-effort recovery of transfer counts from a transfer tool's log.
//!
//! Each number is looked up with a primary pattern, then an alternate one,
//! and finally estimated from the source tree on disk. Anything that came
//! from the estimate marks the whole result as `estimated`.

use crate::domain::model::{StatsSource, TransferStats};
use crate::domain::patterns::StatsPatterns;
use crate::utils::error::Result;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedStats {
    pub files: u64,
    pub files_source: StatsSource,
    pub bytes: u64,
    pub bytes_source: StatsSource,
}

impl ExtractedStats {
    pub fn is_estimated(&self) -> bool {
        self.files_source == StatsSource::DirectoryScan
            || self.bytes_source == StatsSource::DirectoryScan
    }

    pub fn into_transfer_stats(self, elapsed_secs: u64) -> TransferStats {
        TransferStats {
            files: self.files,
            bytes: self.bytes,
            elapsed_secs,
            estimated: self.is_estimated(),
        }
    }
}

pub fn extract_stats(log_text: &str, patterns: &StatsPatterns, source_dir: &Path) -> Result<ExtractedStats> {
    let files = patterns.files.find(log_text);
    let bytes = patterns.bytes.find(log_text);

    let usage = if files.is_none() || bytes.is_none() {
        tracing::debug!("Transfer summary not found in log, measuring {}", source_dir.display());
        Some(directory_usage(source_dir)?)
    } else {
        None
    };

    let (files, files_source) = files.unwrap_or_else(|| {
        let count = usage.map(|u| u.files).unwrap_or_default();
        (count, StatsSource::DirectoryScan)
    });
    let (bytes, bytes_source) = bytes.unwrap_or_else(|| {
        let size = usage.map(|u| u.bytes).unwrap_or_default();
        (size, StatsSource::DirectoryScan)
    });

    Ok(ExtractedStats {
        files,
        files_source,
        bytes,
        bytes_source,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryUsage {
    pub files: u64,
    pub bytes: u64,
}

/// Regular files and their total size below `dir`. Symlinks are not followed.
pub fn directory_usage(dir: &Path) -> io::Result<DirectoryUsage> {
    let mut usage = DirectoryUsage::default();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let metadata = entry.path().symlink_metadata()?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else if metadata.is_file() {
                usage.files += 1;
                usage.bytes += metadata.len();
            }
        }
    }

    Ok(usage)
}

pub fn write_stats_file(path: &Path, stats: &TransferStats) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, stats.to_stats_file())?;
    Ok(())
}

/// Appends `key=value` outputs to a GitHub Actions `$GITHUB_OUTPUT` file.
pub fn append_github_output(path: &Path, stats: &TransferStats) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(stats.to_github_output().as_bytes())?;
    Ok(())
}
