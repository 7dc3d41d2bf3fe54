//! Shell command tasks

pub mod markers;
pub mod subprocess;

use crate::core::{Inputs, TaskBody, TaskResult};
use anyhow::Context;
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::Value;
pub use subprocess::{CommandError, CommandOutput, SubprocessRunner};
use tracing::debug;

const PLACEHOLDER: &str = r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}";

/// A task body that runs a shell command
///
/// `{{ key }}` placeholders in the command are replaced by the task's inputs
/// before it runs. Stdout becomes the task's result.
#[derive(Debug, Clone)]
pub struct ShellTask {
    command: String,
    runner: SubprocessRunner,
}

impl ShellTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            runner: SubprocessRunner::default(),
        }
    }

    pub fn with_runner(mut self, runner: SubprocessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl TaskBody for ShellTask {
    async fn run(&self, inputs: Inputs) -> TaskResult {
        let command = render_command(&self.command, &inputs)?;
        debug!("Rendered command: {}", command);

        let output = self
            .runner
            .execute(&command)
            .await
            .context("Failed to run command")?;

        if let Some(signal) = markers::find_signal(&output.stdout) {
            return Err(signal.into());
        }

        if !output.success() {
            let code = output
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(anyhow::anyhow!(
                "Command exited with {}: {}",
                code,
                output.stderr.trim()
            )
            .into());
        }

        Ok(parse_output(&output.stdout))
    }
}

/// Replace `{{ key }}` placeholders with input values
///
/// String inputs are inserted verbatim, anything else as JSON. Placeholders
/// without a matching input are an error.
pub fn render_command(template: &str, inputs: &Inputs) -> anyhow::Result<String> {
    let pattern = Regex::new(PLACEHOLDER)?;

    let missing: Vec<&str> = pattern
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|key| key.as_str())
        .filter(|key| inputs.get(key).is_none())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("Command references unknown inputs: {}", missing.join(", "));
    }

    let rendered = pattern.replace_all(template, |caps: &Captures| match inputs.get(&caps[1]) {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => String::new(),
    });

    Ok(rendered.into_owned())
}

/// Interpret command output: empty is null, JSON is parsed, anything else is a string
pub fn parse_output(stdout: &str) -> Value {
    let text = markers::strip_markers(stdout);
    let text = text.trim();

    if text.is_empty() {
        return Value::Null;
    }

    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
