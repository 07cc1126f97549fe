//! External command execution.
//!
//! [`CommandRunner`] is the seam between the pipeline and the operating
//! system: production code uses [`ProcessRunner`], tests substitute a
//! scripted implementation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use forkup_core::types::{SPAWN_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};
use forkup_core::StepResult;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// `git` with interactive credential prompts disabled.
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args).env("GIT_TERMINAL_PROMPT", "0")
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// True when `program` is invoked with exactly these leading arguments.
    pub fn starts_with(&self, program: &str, args: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= args.len()
            && self.args.iter().zip(args).all(|(a, b)| a == b)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Executes one command to completion or timeout.
///
/// Implementations never fail: spawn errors and timeouts are reported as
/// non-zero [`StepResult`]s.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> StepResult;
}

/// Runs commands as child processes via `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> StepResult {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => StepResult {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(err)) => {
                tracing::debug!(command = %spec, error = %err, "failed to spawn command");
                StepResult::failed(
                    SPAWN_FAILURE_EXIT_CODE,
                    format!("failed to launch {}: {err}", spec.program),
                )
            }
            Err(_) => {
                tracing::debug!(command = %spec, timeout_secs = timeout.as_secs(), "command timed out");
                StepResult::failed(
                    TIMEOUT_EXIT_CODE,
                    format!("{spec} timed out after {}s", timeout.as_secs()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_whitespace() {
        let spec = CommandSpec::new("openclaw", ["memory", "search", "hello world", "--json"]);
        assert_eq!(
            spec.to_string(),
            "openclaw memory search \"hello world\" --json"
        );
    }

    #[test]
    fn starts_with_matches_program_and_prefix() {
        let spec = CommandSpec::git(["remote", "get-url", "origin"]);
        assert!(spec.starts_with("git", &["remote", "get-url"]));
        assert!(!spec.starts_with("git", &["remote", "add"]));
        assert!(!spec.starts_with("npm", &[]));
        assert_eq!(spec.env, vec![("GIT_TERMINAL_PROMPT".into(), "0".into())]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_captures_output_and_exit_code() {
        let runner = ProcessRunner;
        let ok = runner
            .run(
                &CommandSpec::new("sh", ["-c", "echo out; echo err >&2"]),
                Duration::from_secs(10),
            )
            .await;
        assert!(ok.success());
        assert_eq!(ok.stdout.trim(), "out");
        assert_eq!(ok.stderr.trim(), "err");

        let failed = runner
            .run(&CommandSpec::new("sh", ["-c", "exit 3"]), Duration::from_secs(10))
            .await;
        assert_eq!(failed.code, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reports_timeout_as_failure() {
        let result = ProcessRunner
            .run(&CommandSpec::new("sleep", ["5"]), Duration::from_millis(100))
            .await;
        assert_eq!(result.code, TIMEOUT_EXIT_CODE);
        assert!(result.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn process_runner_reports_missing_program() {
        let result = ProcessRunner
            .run(
                &CommandSpec::new("forkup-definitely-not-a-real-binary", Vec::<String>::new()),
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(result.code, SPAWN_FAILURE_EXIT_CODE);
        assert!(!result.success());
    }
}
