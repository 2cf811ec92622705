//! External command invocation
//!
//! Cleanup and deployment teardown shell out to external tools (helm, git,
//! kubectl). The injectable `CommandRunner` seam keeps that logic testable
//! without a live cluster.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Captured result of an external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the command exited successfully
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Runs opaque external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally in `cwd`, and capture its output
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>)
        -> Result<CommandOutput>;
}

/// `CommandRunner` backed by real child processes
#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<CommandOutput> {
        let mut command = tokio::process::Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command.output().await?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A recorded invocation, used by test doubles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory, if any
    pub cwd: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let output = ProcessRunner
            .run("echo", &["hello"], None)
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_process_runner_reports_failure() {
        let output = ProcessRunner
            .run("sh", &["-c", "exit 3"], None)
            .await
            .unwrap();

        assert!(!output.success);
    }

    #[tokio::test]
    async fn test_process_runner_missing_program_is_error() {
        let result = ProcessRunner
            .run("definitely-not-a-real-program", &[], None)
            .await;

        assert!(result.is_err());
    }
}
