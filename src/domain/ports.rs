use crate::domain::model::{ExcludePatternList, TransportKind};
use crate::domain::patterns::StatsPatterns;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A fully assembled external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined for log output. Environment values are never shown.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// One push of a local tree to a remote directory.
#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    pub local_dir: &'a Path,
    pub remote_dir: &'a str,
    pub excludes: &'a ExcludePatternList,
    /// Remove remote files that no longer exist locally.
    pub delete: bool,
    pub dry_run: bool,
}

#[async_trait]
pub trait RemoteSynchronizer: Send + Sync {
    fn kind(&self) -> TransportKind;

    fn stats_patterns(&self) -> &StatsPatterns;

    async fn check_connection(&self) -> Result<()>;

    /// Runs the transfer tool and returns its raw output; a non-zero exit is not an error here.
    async fn mirror(&self, request: &SyncRequest<'_>) -> Result<CommandOutput>;
}
