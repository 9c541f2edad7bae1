//! Subprocess execution with a mockable seam.
//!
//! Every package manager invocation is one-shot, short-lived and
//! non-interactive: stdin is never read, stdout and stderr are captured.
//! Production code runs [`SystemRunner`]; tests program a [`FakeRunner`]
//! keyed by the full command line.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    process::Stdio,
    sync::Mutex,
};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Error, Diagnostic, Debug)]
pub enum CommandError {
    #[error("Failed to launch '{program}'")]
    #[diagnostic(
        code(plonk::command_execution),
        help("Check that the binary is installed and on your PATH")
    )]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}", code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    #[diagnostic(code(plonk::command_execution))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        /// Captured stdout and stderr, in that order.
        output: String,
    },

    #[error("'{program}' produced non-UTF-8 output")]
    #[diagnostic(code(plonk::command_execution))]
    Utf8 { program: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(plonk::cancelled))]
    Cancelled,
}

impl CommandError {
    /// Exit code of the failed subprocess, when it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitStatus { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured output of the failed subprocess.
    pub fn output(&self) -> &str {
        match self {
            Self::ExitStatus { output, .. } => output,
            _ => "",
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Cancellable subprocess runner.
///
/// Implementations must not start a subprocess after `token` is cancelled,
/// and must surface cancellation as [`CommandError::Cancelled`] rather than
/// a wrapped subprocess error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and returns captured stdout.
    ///
    /// A non-zero exit is an error carrying the exit code and output.
    async fn execute(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String>;

    /// Runs the command and returns captured stdout and stderr together.
    async fn execute_combined(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String>;

    /// Resolves `program` on PATH, `None` when absent.
    fn look_path(&self, program: &str) -> Option<PathBuf>;
}

/// Production runner backed by [`tokio::process::Command`].
#[derive(Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    async fn run(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
        combined: bool,
    ) -> CommandResult<String> {
        if token.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        trace!(program, ?args, "spawning subprocess");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Launch {
                program: program.to_string(),
                source,
            })?;

        // Dropping the wait future kills the child via kill_on_drop.
        let output = tokio::select! {
            _ = token.cancelled() => return Err(CommandError::Cancelled),
            output = child.wait_with_output() => output.map_err(|source| CommandError::Launch {
                program: program.to_string(),
                source,
            })?,
        };

        let stdout = String::from_utf8(output.stdout).map_err(|_| CommandError::Utf8 {
            program: program.to_string(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            if combined {
                Ok(format!("{stdout}{stderr}"))
            } else {
                Ok(stdout)
            }
        } else {
            Err(CommandError::ExitStatus {
                program: program.to_string(),
                code: output.status.code(),
                output: format!("{stdout}{stderr}"),
            })
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn execute(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String> {
        self.run(token, program, args, false).await
    }

    async fn execute_combined(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String> {
        self.run(token, program, args, true).await
    }

    fn look_path(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// A canned response for one command line.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Table-driven fake runner for tests.
///
/// Responses are keyed by the full command line (`"brew install jq"`).
/// Commands for binaries that were never declared fail the way a missing
/// binary does; declared binaries with no programmed response exit 1.
/// Every invocation is recorded for later assertions.
#[derive(Default)]
pub struct FakeRunner {
    binaries: HashSet<String>,
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `binary` as present on PATH.
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binaries.insert(binary.to_string());
        self
    }

    /// Programs a successful response for an exact command line.
    pub fn on(self, command_line: &str, stdout: &str) -> Self {
        self.on_code(command_line, stdout, 0)
    }

    /// Programs a response with an explicit exit code.
    pub fn on_code(self, command_line: &str, output: &str, code: i32) -> Self {
        self.responses.lock().unwrap().insert(
            command_line.to_string(),
            FakeResponse {
                stdout: output.to_string(),
                stderr: String::new(),
                code,
            },
        );
        self
    }

    /// Every command line executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn lookup(&self, program: &str, args: &[&str]) -> CommandResult<FakeResponse> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        if !self.binaries.contains(program) {
            return Err(CommandError::Launch {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&line)
            .cloned()
            .unwrap_or(FakeResponse {
                stdout: String::new(),
                stderr: format!("fake runner: no response for '{line}'"),
                code: 1,
            }))
    }

    fn respond(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<FakeResponse> {
        if token.is_cancelled() {
            return Err(CommandError::Cancelled);
        }
        let response = self.lookup(program, args)?;
        if response.code == 0 {
            Ok(response)
        } else {
            Err(CommandError::ExitStatus {
                program: program.to_string(),
                code: Some(response.code),
                output: format!("{}{}", response.stdout, response.stderr),
            })
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn execute(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String> {
        self.respond(token, program, args).map(|r| r.stdout)
    }

    async fn execute_combined(
        &self,
        token: &CancellationToken,
        program: &str,
        args: &[&str],
    ) -> CommandResult<String> {
        self.respond(token, program, args)
            .map(|r| format!("{}{}", r.stdout, r.stderr))
    }

    fn look_path(&self, program: &str) -> Option<PathBuf> {
        self.binaries
            .contains(program)
            .then(|| PathBuf::from(format!("/usr/local/bin/{program}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_runner_programmed_response() {
        let runner = FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0\n");

        let token = CancellationToken::new();
        let out = runner.execute(&token, "brew", &["--version"]).await.unwrap();
        assert_eq!(out, "Homebrew 4.0\n");
        assert_eq!(runner.calls(), vec!["brew --version"]);
    }

    #[tokio::test]
    async fn test_fake_runner_missing_binary() {
        let runner = FakeRunner::new();
        let token = CancellationToken::new();
        let err = runner.execute(&token, "npm", &["--version"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_fake_runner_nonzero_exit_carries_code_and_output() {
        let runner = FakeRunner::new()
            .with_binary("brew")
            .on_code("brew install nope", "Error: No available formula", 1);

        let token = CancellationToken::new();
        let err = runner
            .execute_combined(&token, "brew", &["install", "nope"])
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert!(err.output().contains("No available formula"));
    }

    #[tokio::test]
    async fn test_cancelled_token_starts_no_subprocess() {
        let runner = FakeRunner::new().with_binary("brew");
        let token = CancellationToken::new();
        token.cancel();

        let err = runner.execute(&token, "brew", &["list"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Cancelled));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_system_runner_cancelled_before_spawn() {
        let runner = SystemRunner::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = runner.execute(&token, "true", &[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Cancelled));
    }

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::new();
        let token = CancellationToken::new();
        let out = runner.execute(&token, "echo", &["hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_runner_nonzero_exit() {
        let runner = SystemRunner::new();
        let token = CancellationToken::new();
        let err = runner.execute(&token, "false", &[]).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }
}
