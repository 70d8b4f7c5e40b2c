#![allow(dead_code)]

use async_trait::async_trait;
use kinsta_deploy::config::{
    DeployConfig, HOST_VAR, PASSWORD_VAR, PORT_VAR, SOURCE_PATH_VAR, STATS_FILE_VAR, TARGET_PATH_VAR,
    USERNAME_VAR,
};
use kinsta_deploy::domain::ports::{CommandOutput, CommandRunner, CommandSpec};
use kinsta_deploy::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const RSYNC_STATS_OUTPUT: &str = "\
>f+++++++++ index.php
>f.st...... wp-content/themes/site/style.css

Number of files: 1,412 (reg: 1,200, dir: 212)
Number of regular files transferred: 2
Total file size: 45,678,901 bytes
Total transferred file size: 12,345 bytes

sent 6,789 bytes  received 1,234 bytes  3,209.20 bytes/sec
total size is 45,678,901  speedup is 5,693.19
";

/// What a recorded command was, from the point of view of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `sshpass -e ssh ... <remote command>`
    Ssh(String),
    /// `sshpass -e rsync ...`, with its full argument list
    Rsync(Vec<String>),
    /// `lftp -f <script>`, with the script text read at call time
    Lftp(String),
    Other(String),
}

pub fn classify(spec: &CommandSpec) -> Call {
    match (spec.program.as_str(), spec.args.get(1).map(String::as_str)) {
        ("sshpass", Some("ssh")) => Call::Ssh(spec.args.last().cloned().unwrap_or_default()),
        ("sshpass", Some("rsync")) => Call::Rsync(spec.args.clone()),
        ("lftp", _) => {
            let script = spec
                .args
                .last()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .unwrap_or_default();
            Call::Lftp(script)
        }
        _ => Call::Other(spec.display()),
    }
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

type Responder = dyn Fn(&Call) -> CommandOutput + Send + Sync;

/// Stands in for the system shell: records every command and answers from a script.
pub struct ScriptedRunner {
    respond: Box<Responder>,
    calls: Mutex<Vec<CommandSpec>>,
    classified: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&Call) -> CommandOutput + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
            classified: Mutex::new(Vec::new()),
        }
    }

    /// Every command succeeds; rsync prints a real `--stats` block and the cache purge confirms.
    pub fn happy_path() -> Self {
        Self::new(|call| match call {
            Call::Ssh(cmd) if cmd.contains("wp kinsta cache purge") => ok("Success: Cache purged."),
            Call::Ssh(_) => ok("connected"),
            Call::Rsync(_) => ok(RSYNC_STATS_OUTPUT),
            _ => ok(""),
        })
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.classified.lock().unwrap().clone()
    }

    pub fn rsync_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rsync(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn ssh_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Ssh(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let call = classify(spec);
        self.calls.lock().unwrap().push(spec.clone());
        self.classified.lock().unwrap().push(call.clone());
        Ok((self.respond)(&call))
    }
}

/// A valid config pointing at `source`, writing stats under `stats_dir`.
pub fn test_config(source: &Path, stats_dir: &Path) -> DeployConfig {
    let values: HashMap<String, String> = [
        (HOST_VAR, "35.200.1.2".to_string()),
        (USERNAME_VAR, "mysite".to_string()),
        (PASSWORD_VAR, "s3cret".to_string()),
        (PORT_VAR, "41234".to_string()),
        (TARGET_PATH_VAR, "/www/mysite_123/public".to_string()),
        (SOURCE_PATH_VAR, source.display().to_string()),
        (
            STATS_FILE_VAR,
            stats_dir.join("kinsta_deploy_stats.txt").display().to_string(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    DeployConfig::from_lookup(|key| values.get(key).cloned()).unwrap()
}

/// Builds a small WordPress-looking tree: 3 files, 19 bytes in total.
pub fn write_site(dir: &Path) {
    std::fs::create_dir_all(dir.join("wp-content/themes/site")).unwrap();
    std::fs::write(dir.join("index.php"), "<?php\n").unwrap();
    std::fs::write(dir.join("wp-config.php"), "<?php //\n").unwrap();
    std::fs::write(dir.join("wp-content/themes/site/style.css"), "a{}\n").unwrap();
}

/// A zip with a loader file and a plugin directory, like the Kinsta MU plugin bundle.
pub fn plugin_zip() -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        writer.start_file("kinsta-mu-plugins.php", options).unwrap();
        writer.write_all(b"<?php // loader\n").unwrap();
        writer.add_directory("kinsta-mu-plugins/", options).unwrap();
        writer
            .start_file("kinsta-mu-plugins/kinsta-mu-plugins.php", options)
            .unwrap();
        writer.write_all(b"<?php // plugin\n").unwrap();
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

/// In-memory log sink for asserting on what was logged and at which level.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's tracing events here until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let tag = format!(" {} ", level);
        self.contents()
            .lines()
            .filter(|line| line.contains(&tag))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
