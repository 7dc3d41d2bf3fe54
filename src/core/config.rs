//! Flow configuration from YAML

use crate::command::ShellTask;
use crate::core::{Flow, Task, TaskId, Trigger};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Top-level flow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow name
    pub name: String,

    /// Flow version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Settings applied to every task unless overridden
    #[serde(default)]
    pub defaults: TaskDefaults,

    /// Run-time parameters
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,

    /// Flow tasks
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Defaults for task settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDefaults {
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub retry_delay_secs: u64,

    /// No limit when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A parameter the flow accepts at run time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,

    /// Used when the run does not supply a value; required otherwise
    #[serde(default)]
    pub default: Option<Value>,
}

/// Task configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task identifier, also the task's name
    pub id: String,

    /// Shell command; `{{ key }}` placeholders are filled from `inputs`
    pub command: String,

    /// Keyword inputs: keyword -> upstream task id or parameter name
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    /// Ordering-only dependencies
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Overrides `defaults.max_retries`
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Overrides `defaults.retry_delay_secs`
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,

    /// Overrides `defaults.timeout_secs`
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TaskConfig {
    /// Every id this task depends on, bound or not
    fn upstream_ids(&self) -> impl Iterator<Item = &String> {
        self.inputs.values().chain(self.depends_on.iter())
    }
}

/// Built-in triggers selectable from YAML
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerConfig {
    #[default]
    AllSuccessful,
    AllFailed,
}

impl TriggerConfig {
    pub fn to_trigger(self) -> Trigger {
        match self {
            TriggerConfig::AllSuccessful => Trigger::all_successful(),
            TriggerConfig::AllFailed => Trigger::all_failed(),
        }
    }
}

impl FlowConfig {
    /// Load flow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse flow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FlowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the flow configuration
    pub fn validate(&self) -> Result<()> {
        // Task ids and parameter names share one namespace
        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                anyhow::bail!("Duplicate parameter: {}", param.name);
            }
        }
        for task in &self.tasks {
            if !seen.insert(task.id.as_str()) {
                anyhow::bail!("Duplicate task ID: {}", task.id);
            }
        }

        for task in &self.tasks {
            for (key, source) in &task.inputs {
                if !seen.contains(source.as_str()) {
                    anyhow::bail!(
                        "Task '{}' input '{}' references non-existent task or parameter '{}'",
                        task.id,
                        key,
                        source
                    );
                }
            }
            for dep in &task.depends_on {
                if !seen.contains(dep.as_str()) {
                    anyhow::bail!("Task '{}' depends on non-existent task '{}'", task.id, dep);
                }
            }
        }

        self.check_cycles()
    }

    /// Check for cycles in the task dependency graph
    fn check_cycles(&self) -> Result<()> {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for task in &self.tasks {
            if !visited.contains(&task.id) {
                self.dfs_check(&task.id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check(
        &self,
        task_id: &str,
        visited: &mut HashSet<String>,
        recursion_stack: &mut HashSet<String>,
    ) -> Result<()> {
        visited.insert(task_id.to_string());
        recursion_stack.insert(task_id.to_string());

        if let Some(task) = self.tasks.iter().find(|t| t.id == task_id) {
            for dep in task.upstream_ids() {
                if recursion_stack.contains(dep) {
                    anyhow::bail!("Cycle detected in dependency graph involving task '{}'", dep);
                }
                if !visited.contains(dep) {
                    self.dfs_check(dep, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(task_id);
        Ok(())
    }

    /// Build the flow: one parameter task per parameter, one shell task per task
    pub fn to_flow(&self) -> Result<Flow> {
        let mut flow = Flow::new(&self.name);
        let mut ids: HashMap<&str, TaskId> = HashMap::new();

        for param in &self.parameters {
            let task = match &param.default {
                Some(default) => Task::parameter_with_default(&param.name, default.clone()),
                None => Task::parameter(&param.name),
            };
            ids.insert(&param.name, flow.add_task(task)?);
        }

        for config in &self.tasks {
            let mut task = Task::new(&config.id, ShellTask::new(&config.command))
                .with_trigger(config.trigger.to_trigger())
                .with_max_retries(config.max_retries.unwrap_or(self.defaults.max_retries))
                .with_retry_delay(Duration::from_secs(
                    config
                        .retry_delay_secs
                        .unwrap_or(self.defaults.retry_delay_secs),
                ));
            if let Some(secs) = config.timeout_secs.or(self.defaults.timeout_secs) {
                task = task.with_timeout(Duration::from_secs(secs));
            }
            ids.insert(&config.id, flow.add_task(task)?);
        }

        let lookup = |name: &str| {
            ids.get(name)
                .copied()
                .with_context(|| format!("Unknown task or parameter '{}'", name))
        };

        for config in &self.tasks {
            let task = lookup(&config.id)?;
            for (key, source) in &config.inputs {
                flow.add_edge(lookup(source)?, task, Some(key.as_str()))?;
            }
            for dep in &config.depends_on {
                if !config.inputs.values().any(|source| source == dep) {
                    flow.add_edge(lookup(dep)?, task, None)?;
                }
            }
        }

        Ok(flow)
    }
}
