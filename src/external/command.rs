//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::config::CommandSpec;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// Last few lines of stderr, falling back to stdout, for error messages
    pub fn diagnostic_tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let collected: Vec<&str> = source.trim_end().lines().collect();
        let start = collected.len().saturating_sub(lines);
        collected[start..].join("\n")
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("IO error running {command}: {message}")]
    Io { command: String, message: String },
}

/// Trait for executing external commands
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `spec` in `cwd` and wait for it to exit
    async fn execute(&self, spec: &CommandSpec, cwd: &Path) -> Result<CommandOutput, CommandError>;
}

/// Real implementation backed by tokio's process support
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, spec: &CommandSpec, cwd: &Path) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %spec.display(), cwd = %cwd.display(), "Running command");

        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: spec.program.clone(),
                    }
                } else {
                    CommandError::Io {
                        command: spec.program.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
