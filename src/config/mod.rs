#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{
    ExcludePatternList, RemoteTarget, TransportKind, DEFAULT_EXCLUDE_PATTERNS,
};
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_port, validate_relative_subpath,
    validate_url, Validate,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const HOST_VAR: &str = "KINSTA_HOST_IP";
pub const USERNAME_VAR: &str = "KINSTA_USERNAME";
pub const PASSWORD_VAR: &str = "KINSTA_PASSWORD";
pub const PORT_VAR: &str = "KINSTA_PORT";
pub const TARGET_PATH_VAR: &str = "TARGET_PATH";
pub const SOURCE_PATH_VAR: &str = "SOURCE_PATH";
pub const EXCLUDE_PATTERNS_VAR: &str = "EXCLUDE_PATTERNS";
pub const DRY_RUN_VAR: &str = "DRY_RUN";
pub const VERBOSE_VAR: &str = "VERBOSE";
pub const INSTALL_MU_PLUGIN_VAR: &str = "INSTALL_KINSTA_MU_PLUGIN";
pub const MU_PLUGIN_PATH_VAR: &str = "KINSTA_MU_PLUGIN_PATH";
pub const MU_PLUGIN_URL_VAR: &str = "KINSTA_MU_PLUGIN_URL";
pub const PURGE_CACHE_VAR: &str = "PURGE_KINSTA_CACHE";
pub const TRANSPORT_VAR: &str = "DEPLOY_TRANSPORT";
pub const STATS_FILE_VAR: &str = "DEPLOY_STATS_FILE";
pub const GITHUB_OUTPUT_VAR: &str = "GITHUB_OUTPUT";

pub const REQUIRED_VARS: [&str; 5] = [HOST_VAR, USERNAME_VAR, PASSWORD_VAR, PORT_VAR, TARGET_PATH_VAR];

pub const DEFAULT_SOURCE_PATH: &str = ".";
pub const DEFAULT_MU_PLUGIN_PATH: &str = "wp-content/mu-plugins";
pub const DEFAULT_MU_PLUGIN_URL: &str = "https://kinsta.com/kinsta-tools/kinsta-mu-plugins.zip";
pub const DEFAULT_STATS_FILE_NAME: &str = "kinsta_deploy_stats.txt";

/// Everything a single deployment run needs. Built once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub remote: RemoteTarget,
    pub target_path: String,
    pub source_path: PathBuf,
    pub exclude_patterns: ExcludePatternList,
    pub dry_run: bool,
    pub verbose: bool,
    pub install_mu_plugin: bool,
    pub mu_plugin_path: String,
    pub mu_plugin_url: String,
    pub purge_cache: bool,
    pub transport: TransportKind,
    pub stats_file: PathBuf,
    /// Set by GitHub Actions; outputs are appended to it when present.
    pub github_output: Option<PathBuf>,
}

impl DeployConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment first, then values taken from a config file.
    pub fn from_env_with_fallback(file_values: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_values.get(key).cloned())
        })
    }

    /// Builds the config from any key lookup. All missing required names are
    /// reported together, before anything else is checked.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DeployError::MissingConfigError { fields: missing });
        }

        let required = |key: &str| get(key).unwrap_or_default();
        let flag = |key: &str, default: bool| get(key).map(|v| v == "true").unwrap_or(default);

        let port = validate_port(PORT_VAR, &required(PORT_VAR))?;
        let transport = match get(TRANSPORT_VAR) {
            Some(value) => value.parse::<TransportKind>().map_err(|reason| {
                DeployError::InvalidConfigValueError {
                    field: TRANSPORT_VAR.to_string(),
                    value: value.clone(),
                    reason,
                }
            })?,
            None => TransportKind::default(),
        };

        let config = Self {
            remote: RemoteTarget {
                host: required(HOST_VAR).trim().to_string(),
                port,
                username: required(USERNAME_VAR).trim().to_string(),
                password: required(PASSWORD_VAR),
            },
            target_path: normalize_remote_dir(&required(TARGET_PATH_VAR)),
            source_path: PathBuf::from(
                get(SOURCE_PATH_VAR).unwrap_or_else(|| DEFAULT_SOURCE_PATH.to_string()),
            ),
            exclude_patterns: ExcludePatternList::parse(
                &get(EXCLUDE_PATTERNS_VAR).unwrap_or_else(|| DEFAULT_EXCLUDE_PATTERNS.to_string()),
            ),
            dry_run: flag(DRY_RUN_VAR, false),
            verbose: flag(VERBOSE_VAR, false),
            install_mu_plugin: flag(INSTALL_MU_PLUGIN_VAR, true),
            mu_plugin_path: get(MU_PLUGIN_PATH_VAR)
                .map(|p| p.trim().trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_MU_PLUGIN_PATH.to_string()),
            mu_plugin_url: get(MU_PLUGIN_URL_VAR)
                .map(|u| u.trim().to_string())
                .unwrap_or_else(|| DEFAULT_MU_PLUGIN_URL.to_string()),
            purge_cache: flag(PURGE_CACHE_VAR, true),
            transport,
            stats_file: get(STATS_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STATS_FILE_NAME)),
            github_output: get(GITHUB_OUTPUT_VAR).map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Remote directory the MU plugin tree is uploaded into.
    pub fn remote_plugin_dir(&self) -> String {
        join_remote(&self.target_path, &self.mu_plugin_path)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_path
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(HOST_VAR, &self.remote.host)?;
        validate_non_empty_string(USERNAME_VAR, &self.remote.username)?;
        validate_path(TARGET_PATH_VAR, &self.target_path)?;
        validate_path(SOURCE_PATH_VAR, &self.source_path.to_string_lossy())?;
        validate_relative_subpath(MU_PLUGIN_PATH_VAR, &self.mu_plugin_path)?;
        validate_url(MU_PLUGIN_URL_VAR, &self.mu_plugin_url)?;
        Ok(())
    }
}

/// Trims whitespace and trailing slashes, keeping a bare `/` intact.
pub fn normalize_remote_dir(path: &str) -> String {
    let trimmed = path.trim();
    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() && trimmed.starts_with('/') {
        "/".to_string()
    } else {
        without_slash.to_string()
    }
}

pub fn join_remote(base: &str, child: &str) -> String {
    let child = child.trim_matches('/');
    let trimmed = base.trim_end_matches('/');
    match (trimmed.is_empty(), child.is_empty()) {
        (_, true) => normalize_remote_dir(base),
        (true, false) if base.starts_with('/') => format!("/{}", child),
        (true, false) => child.to_string(),
        (false, false) => format!("{}/{}", trimmed, child),
    }
}
