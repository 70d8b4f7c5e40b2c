use crate::config::toml_config::DeployFile;
use crate::config::DeployConfig;
use crate::domain::model::TransportKind;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Rsync,
    Lftp,
}

impl From<TransportArg> for TransportKind {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Rsync => TransportKind::Rsync,
            TransportArg::Lftp => TransportKind::Lftp,
        }
    }
}

/// Deploys a WordPress site to Kinsta. Connection settings come from the
/// environment (KINSTA_HOST_IP, KINSTA_USERNAME, KINSTA_PASSWORD, KINSTA_PORT,
/// TARGET_PATH, ...) or from an optional TOML file.
#[derive(Debug, Clone, Parser)]
#[command(name = "kinsta-deploy")]
#[command(about = "Deploy a WordPress site to Kinsta over SSH/SFTP")]
pub struct CliArgs {
    /// TOML file with [kinsta] and [deploy] tables; environment variables override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the FILES_TRANSFERRED/BYTES_TRANSFERRED/DEPLOYMENT_TIME summary
    #[arg(long)]
    pub stats_file: Option<PathBuf>,

    /// Transfer tool, overriding DEPLOY_TRANSPORT
    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Show what would change without touching the server
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl CliArgs {
    /// Resolves flags > environment > config file > defaults.
    pub fn load_config(&self) -> Result<DeployConfig> {
        let file_values = match &self.config {
            Some(path) => DeployFile::from_file(path)?.to_lookup_values(),
            None => HashMap::new(),
        };

        let mut config = DeployConfig::from_env_with_fallback(&file_values)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut DeployConfig) {
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }
        if let Some(transport) = self.transport {
            config.transport = transport.into();
        }
        if let Some(path) = &self.stats_file {
            config.stats_file = path.clone();
        }
    }
}
