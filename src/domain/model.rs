use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_EXCLUDE_PATTERNS: &str = ".git,.github,node_modules,.env,.DS_Store,*.log";

/// Ordered glob patterns from a comma-separated value. Empty entries are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExcludePatternList {
    patterns: Vec<String>,
}

impl ExcludePatternList {
    pub fn parse(value: &str) -> Self {
        Self::from_patterns(value.split(','))
    }

    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn rsync_flags(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| format!("--exclude={}", p))
            .collect()
    }

    pub fn lftp_flags(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| format!("--exclude-glob={}", p))
            .collect()
    }
}

/// Which external tool pushes files to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Rsync,
    Lftp,
}

impl TransportKind {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Rsync => "rsync",
            Self::Lftp => "lftp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsync" => Ok(Self::Rsync),
            "lftp" | "sftp" => Ok(Self::Lftp),
            other => Err(format!("unknown transport '{}', expected rsync or lftp", other)),
        }
    }
}

/// Connection details for the SSH/SFTP endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl RemoteTarget {
    pub fn user_at_host(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where a statistics value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    PrimaryPattern,
    AlternatePattern,
    DirectoryScan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub files: u64,
    pub bytes: u64,
    pub elapsed_secs: u64,
    /// True when any number is a fallback estimate rather than tool output.
    pub estimated: bool,
}

impl TransferStats {
    pub fn to_stats_file(&self) -> String {
        format!(
            "FILES_TRANSFERRED:{}\nBYTES_TRANSFERRED:{}\nDEPLOYMENT_TIME:{}\nSTATS_ESTIMATED:{}\n",
            self.files, self.bytes, self.elapsed_secs, self.estimated
        )
    }

    pub fn to_github_output(&self) -> String {
        format!(
            "files-transferred={}\nbytes-transferred={}\ndeployment-time={}\nstats-estimated={}\n",
            self.files, self.bytes, self.elapsed_secs, self.estimated
        )
    }
}

/// Result of a step whose failure does not fail the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Skipped(String),
    Degraded(String),
}

impl StepOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub transport: TransportKind,
    pub dry_run: bool,
    pub stats: TransferStats,
    pub plugin: StepOutcome,
    pub cache: StepOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_patterns_trim_and_keep_order() {
        let list = ExcludePatternList::parse(" .git, ,node_modules,*.log ,");
        assert_eq!(list.patterns(), &[".git", "node_modules", "*.log"]);
        assert_eq!(
            list.rsync_flags(),
            vec!["--exclude=.git", "--exclude=node_modules", "--exclude=*.log"]
        );
        assert_eq!(
            list.lftp_flags(),
            vec![
                "--exclude-glob=.git",
                "--exclude-glob=node_modules",
                "--exclude-glob=*.log"
            ]
        );
    }

    #[test]
    fn test_default_exclude_patterns() {
        let list = ExcludePatternList::parse(DEFAULT_EXCLUDE_PATTERNS);
        assert_eq!(list.patterns().len(), 6);
        assert_eq!(list.patterns()[0], ".git");
        assert_eq!(list.patterns()[5], "*.log");
    }

    #[test]
    fn test_empty_value_gives_no_flags() {
        let list = ExcludePatternList::parse(" , ,");
        assert!(list.is_empty());
        assert!(list.rsync_flags().is_empty());
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("rsync".parse::<TransportKind>().unwrap(), TransportKind::Rsync);
        assert_eq!(" LFTP ".parse::<TransportKind>().unwrap(), TransportKind::Lftp);
        assert!("scp".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_stats_file_format() {
        let stats = TransferStats {
            files: 12,
            bytes: 34567,
            elapsed_secs: 8,
            estimated: false,
        };
        assert_eq!(
            stats.to_stats_file(),
            "FILES_TRANSFERRED:12\nBYTES_TRANSFERRED:34567\nDEPLOYMENT_TIME:8\nSTATS_ESTIMATED:false\n"
        );
    }

    #[test]
    fn test_remote_target_debug_hides_password() {
        let target = RemoteTarget {
            host: "35.1.2.3".to_string(),
            port: 41234,
            username: "site".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", target);
        assert!(!rendered.contains("hunter2"));
        assert_eq!(target.user_at_host(), "site@35.1.2.3");
    }
}
