//! Subprocess runner - executes shell commands and captures their output

use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Error types for command execution
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs commands through a shell
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    /// Shell executable, invoked as `<shell> -c <command>`
    shell: String,

    /// Working directory for commands; inherits the current one when unset
    working_dir: Option<PathBuf>,
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
        }
    }
}

impl SubprocessRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Execute a command and capture stdout and stderr
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    /// The child is killed if the returned future is dropped, which is how
    /// task timeouts stop a running command.
    pub async fn execute(&self, command: &str) -> Result<CommandOutput, CommandError> {
        debug!("Spawning {} -c {:?}", self.shell, command);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| CommandError::Spawn {
            shell: self.shell.clone(),
            source,
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8(output.stdout)?,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };

        if !result.success() {
            warn!(
                "Command exited with code {:?}: {}",
                result.code,
                result.stderr.trim()
            );
        }
        debug!("Command returned {} bytes of output", result.stdout.len());

        Ok(result)
    }
}
