use crate::config::{
    DRY_RUN_VAR, EXCLUDE_PATTERNS_VAR, HOST_VAR, INSTALL_MU_PLUGIN_VAR, MU_PLUGIN_PATH_VAR,
    MU_PLUGIN_URL_VAR, PASSWORD_VAR, PORT_VAR, PURGE_CACHE_VAR, SOURCE_PATH_VAR, STATS_FILE_VAR,
    TARGET_PATH_VAR, TRANSPORT_VAR, USERNAME_VAR, VERBOSE_VAR,
};
use crate::utils::error::{DeployError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Optional deployment file. Every value can also come from the environment,
/// which always wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployFile {
    #[serde(default)]
    pub kinsta: KinstaSection,
    #[serde(default)]
    pub deploy: DeploySection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KinstaSection {
    pub host_ip: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub install_mu_plugin: Option<bool>,
    pub mu_plugin_path: Option<String>,
    pub mu_plugin_url: Option<String>,
    pub purge_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploySection {
    pub source_path: Option<String>,
    pub target_path: Option<String>,
    pub exclude_patterns: Option<Vec<String>>,
    pub dry_run: Option<bool>,
    pub verbose: Option<bool>,
    pub transport: Option<String>,
    pub stats_file: Option<String>,
}

impl DeployFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DeployError::ConfigFileError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with(content, |name| std::env::var(name).ok())
    }

    /// Parses the file, then expands `${VAR}` inside string values using `lookup`.
    /// A value naming a variable that `lookup` cannot resolve is dropped, so a
    /// required field left as a placeholder is reported as missing.
    pub fn from_toml_str_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut file: Self = toml::from_str(content).map_err(|e| DeployError::ConfigFileError {
            message: format!("TOML parsing error: {}", e),
        })?;

        let expander = VarExpander::new(lookup)?;
        let k = &mut file.kinsta;
        expander.expand_field("kinsta.host_ip", &mut k.host_ip);
        expander.expand_field("kinsta.username", &mut k.username);
        expander.expand_field("kinsta.password", &mut k.password);
        expander.expand_field("kinsta.mu_plugin_path", &mut k.mu_plugin_path);
        expander.expand_field("kinsta.mu_plugin_url", &mut k.mu_plugin_url);

        let d = &mut file.deploy;
        expander.expand_field("deploy.source_path", &mut d.source_path);
        expander.expand_field("deploy.target_path", &mut d.target_path);
        expander.expand_field("deploy.transport", &mut d.transport);
        expander.expand_field("deploy.stats_file", &mut d.stats_file);
        if let Some(patterns) = d.exclude_patterns.take() {
            d.exclude_patterns = Some(
                patterns
                    .into_iter()
                    .filter_map(|p| expander.expand("deploy.exclude_patterns", &p))
                    .collect(),
            );
        }

        Ok(file)
    }

    /// Flattens the file into the same key space as the environment variables.
    pub fn to_lookup_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                values.insert(key.to_string(), value);
            }
        };

        let k = &self.kinsta;
        put(HOST_VAR, k.host_ip.clone());
        put(USERNAME_VAR, k.username.clone());
        put(PASSWORD_VAR, k.password.clone());
        put(PORT_VAR, k.port.map(|p| p.to_string()));
        put(INSTALL_MU_PLUGIN_VAR, k.install_mu_plugin.map(|b| b.to_string()));
        put(MU_PLUGIN_PATH_VAR, k.mu_plugin_path.clone());
        put(MU_PLUGIN_URL_VAR, k.mu_plugin_url.clone());
        put(PURGE_CACHE_VAR, k.purge_cache.map(|b| b.to_string()));

        let d = &self.deploy;
        put(SOURCE_PATH_VAR, d.source_path.clone());
        put(TARGET_PATH_VAR, d.target_path.clone());
        put(EXCLUDE_PATTERNS_VAR, d.exclude_patterns.as_ref().map(|p| p.join(",")));
        put(DRY_RUN_VAR, d.dry_run.map(|b| b.to_string()));
        put(VERBOSE_VAR, d.verbose.map(|b| b.to_string()));
        put(TRANSPORT_VAR, d.transport.clone());
        put(STATS_FILE_VAR, d.stats_file.clone());

        values
    }
}

struct VarExpander<F> {
    pattern: Regex,
    lookup: F,
}

impl<F> VarExpander<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")?,
            lookup,
        })
    }

    /// Values are inserted verbatim; nothing is re-parsed as TOML.
    fn expand(&self, field: &str, value: &str) -> Option<String> {
        let mut unresolved = Vec::new();
        let expanded = self.pattern.replace_all(value, |caps: &regex::Captures| {
            let name = &caps[1];
            (self.lookup)(name).unwrap_or_else(|| {
                unresolved.push(name.to_string());
                String::new()
            })
        });

        if unresolved.is_empty() {
            Some(expanded.into_owned())
        } else {
            tracing::warn!(
                "⚠️ Ignoring {} in config file: ${{{}}} is not set",
                field,
                unresolved.join("}, ${")
            );
            None
        }
    }

    fn expand_field(&self, field: &str, value: &mut Option<String>) {
        if let Some(raw) = value.take() {
            *value = self.expand(field, &raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::domain::model::TransportKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_file() {
        let toml_content = r#"
[kinsta]
host_ip = "35.200.1.2"
username = "mysite"
password = "pw"
port = 41234
install_mu_plugin = false

[deploy]
target_path = "/www/mysite_123/public"
exclude_patterns = [".git", "node_modules"]
transport = "lftp"
"#;

        let file = DeployFile::from_toml_str(toml_content).unwrap();
        assert_eq!(file.kinsta.port, Some(41234));

        let values = file.to_lookup_values();
        assert_eq!(values.get(PORT_VAR).map(String::as_str), Some("41234"));
        assert_eq!(
            values.get(EXCLUDE_PATTERNS_VAR).map(String::as_str),
            Some(".git,node_modules")
        );
        assert_eq!(values.get(INSTALL_MU_PLUGIN_VAR).map(String::as_str), Some("false"));
        assert!(!values.contains_key(SOURCE_PATH_VAR));

        let config = DeployConfig::from_lookup(|key| values.get(key).cloned()).unwrap();
        assert_eq!(config.transport, TransportKind::Lftp);
        assert!(!config.install_mu_plugin);
        assert_eq!(config.exclude_patterns.patterns(), &[".git", "node_modules"]);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_var_substitution() {
        let file = DeployFile::from_toml_str_with(
            r#"
[kinsta]
password = "${DEPLOY_SECRET}"
mu_plugin_path = "wp-content/${MU_DIR}"

[deploy]
target_path = "/www/${SITE}/public"
"#,
            vars(&[("DEPLOY_SECRET", "from-env"), ("MU_DIR", "mu-plugins"), ("SITE", "mysite_123")]),
        )
        .unwrap();

        assert_eq!(file.kinsta.password.as_deref(), Some("from-env"));
        assert_eq!(file.kinsta.mu_plugin_path.as_deref(), Some("wp-content/mu-plugins"));
        assert_eq!(file.deploy.target_path.as_deref(), Some("/www/mysite_123/public"));
    }

    #[test]
    fn test_substituted_value_is_taken_verbatim() {
        let secret = r#"a\tb"c\\d"#;
        let file = DeployFile::from_toml_str_with(
            "[kinsta]\npassword = \"${DEPLOY_SECRET}\"\n",
            vars(&[("DEPLOY_SECRET", secret)]),
        )
        .unwrap();

        assert_eq!(file.kinsta.password.as_deref(), Some(secret));
    }

    #[test]
    fn test_unresolved_placeholder_counts_as_missing() {
        let file = DeployFile::from_toml_str_with(
            r#"
[kinsta]
host_ip = "35.200.1.2"
username = "mysite"
password = "${DEPLOY_UNSET_SECRET}"
port = 41234

[deploy]
target_path = "/www/mysite_123/public"
exclude_patterns = [".git", "${DEPLOY_UNSET_PATTERN}"]
"#,
            vars(&[]),
        )
        .unwrap();

        assert_eq!(file.kinsta.password, None);
        assert_eq!(file.deploy.exclude_patterns, Some(vec![".git".to_string()]));

        let values = file.to_lookup_values();
        let err = DeployConfig::from_lookup(|key| values.get(key).cloned()).unwrap_err();
        match err {
            DeployError::MissingConfigError { fields } => assert_eq!(fields, [PASSWORD_VAR]),
            other => panic!("expected MissingConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = DeployFile::from_toml_str("").unwrap();
        assert!(file.to_lookup_values().is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            DeployFile::from_toml_str("[kinsta\nport = "),
            Err(DeployError::ConfigFileError { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[deploy]\nsource_path = \"./public\"\n")
            .unwrap();

        let file = DeployFile::from_file(temp_file.path()).unwrap();
        assert_eq!(file.deploy.source_path.as_deref(), Some("./public"));
    }
}
