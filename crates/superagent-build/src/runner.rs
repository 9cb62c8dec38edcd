//! Subprocess execution for installer and test stages.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::StageError;

/// A command to run inside a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I, cwd: &Path, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
            timeout,
        }
    }

    /// `program arg1 arg2 ...`, for logs and stage details.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output that exited with `exit_code` and printed `stdout`.
    pub fn exited(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Stdout followed by stderr; test frameworks split summaries across both.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Tail of stderr (or stdout when stderr is empty) for error messages.
    pub fn error_tail(&self, max_chars: usize) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let text = text.trim();
        let skip = text.chars().count().saturating_sub(max_chars);
        text.chars().skip(skip).collect()
    }
}

/// Runs external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is an `Ok` output; spawn failures
    /// and timeouts are errors.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StageError>;
}

/// Runs commands with `tokio::process`, killing them when the timeout fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StageError> {
        let start = Instant::now();
        debug!(command = %spec.display(), cwd = %spec.cwd.display(), "spawning");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    StageError::Environment(format!("cannot run {}: {}", spec.program, e))
                }
                _ => StageError::Io(e),
            })?;

        let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
            .await
            .map_err(|_| StageError::Timeout {
                program: spec.program.clone(),
                after: spec.timeout,
            })??;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// In-memory runner that records every command and replays queued outputs.
///
/// With nothing queued, every command exits 0 with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<CommandSpec>>,
    replies: Mutex<VecDeque<Result<CommandOutput, String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output for the next command.
    pub fn push_output(&self, output: CommandOutput) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(output));
        self
    }

    /// Queue an environmental failure (missing tool) for the next command.
    pub fn push_missing(&self, message: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    /// Commands run so far.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().unwrap().clone()
    }

    /// Command lines run so far, e.g. `pip install -r requirements.txt`.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(CommandSpec::display).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StageError> {
        self.commands.lock().unwrap().push(spec.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(StageError::Environment(message)),
            None => Ok(CommandOutput::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(
            program,
            args.iter().copied(),
            &std::env::temp_dir(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_display() {
        assert_eq!(
            spec("pip", &["install", "-r", "requirements.txt"]).display(),
            "pip install -r requirements.txt"
        );
    }

    #[test]
    fn test_error_tail_prefers_stderr() {
        let output = CommandOutput {
            exit_code: 1,
            stdout: "ok".into(),
            stderr: "npm ERR! missing script".into(),
            duration_ms: 0,
        };
        assert_eq!(output.error_tail(6), "script");

        let quiet = CommandOutput::exited(1, "boom");
        assert_eq!(quiet.error_tail(100), "boom");
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let output = TokioCommandRunner
            .run(&spec("echo", &["hello"]))
            .await
            .expect("execute failed");
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let output = TokioCommandRunner
            .run(&spec("false", &[]))
            .await
            .expect("execute failed");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_missing_program_is_environmental() {
        let err = TokioCommandRunner
            .run(&spec("superagent-definitely-not-installed", &[]))
            .await
            .unwrap_err();
        assert!(err.is_environmental());
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let mut slow = spec("sleep", &["5"]);
        slow.timeout = Duration::from_millis(50);
        let err = TokioCommandRunner.run(&slow).await.unwrap_err();
        assert!(matches!(err, StageError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_recording_runner_replays_in_order() {
        let runner = RecordingRunner::new();
        runner
            .push_output(CommandOutput::exited(1, "first"))
            .push_missing("npm not found");

        let first = runner.run(&spec("pip", &["install"])).await.unwrap();
        assert_eq!(first.exit_code, 1);
        assert!(runner.run(&spec("npm", &["install"])).await.is_err());
        assert!(runner.run(&spec("npm", &["test"])).await.unwrap().success());
        assert_eq!(
            runner.command_lines(),
            vec!["pip install", "npm install", "npm test"]
        );
    }
}
