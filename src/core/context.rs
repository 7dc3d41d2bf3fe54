//! Task context - the snapshot of run state a task is evaluated against

use crate::core::{
    error::InputError,
    flow::Flow,
    state::State,
    task::{Inputs, TaskId},
    trigger::UpstreamStates,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Externally supplied parameter values, by parameter name
pub type Parameters = HashMap<String, Value>;

/// A keyword input bound to an upstream task's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: String,
    pub upstream: TaskId,
    pub upstream_name: String,
}

/// Everything a task reads from the run, captured before it is evaluated
///
/// Building the context copies the upstream states, so a task always sees
/// one consistent snapshot even while independent tasks update the run's
/// mapping concurrently.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    /// Name of the task being evaluated
    pub task_name: String,

    /// States of every upstream task
    pub upstream: UpstreamStates,

    /// Keyword bindings, in edge order
    pub bindings: Vec<Binding>,

    /// Parameter values for this run
    pub parameters: Arc<Parameters>,
}

impl TaskContext {
    /// Snapshot the states `id` depends on
    pub fn for_task(
        flow: &Flow,
        id: TaskId,
        states: &HashMap<TaskId, State>,
        parameters: Arc<Parameters>,
    ) -> Self {
        let state_of = |up: TaskId| states.get(&up).cloned().unwrap_or_default();

        let upstream = flow
            .upstream_tasks(id)
            .into_iter()
            .map(|up| (up, state_of(up)))
            .collect();

        let bindings = flow
            .upstream_edges(id)
            .filter_map(|edge| {
                let key = edge.key.clone()?;
                let upstream_name = flow
                    .task(edge.upstream)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| edge.upstream.to_string());
                Some(Binding {
                    key,
                    upstream: edge.upstream,
                    upstream_name,
                })
            })
            .collect();

        Self {
            task_name: flow
                .task(id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| id.to_string()),
            upstream,
            bindings,
            parameters,
        }
    }

    /// Look up a parameter value
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Resolve keyword inputs from upstream results
    ///
    /// A successful upstream without data (e.g. skipped) resolves to `null`;
    /// an upstream that did not succeed has no usable data.
    pub fn resolve_inputs(&self) -> Result<Inputs, InputError> {
        let mut inputs = Inputs::new();

        for binding in &self.bindings {
            let state = self.upstream.get(&binding.upstream).cloned().unwrap_or_default();
            let value = match state.data {
                Some(data) => data,
                None if state.is_successful() => Value::Null,
                None => {
                    return Err(InputError::UnusableUpstream {
                        task: self.task_name.clone(),
                        key: binding.key.clone(),
                        upstream: binding.upstream_name.clone(),
                        state: state.name().to_string(),
                    })
                }
            };
            inputs.insert(binding.key.clone(), value);
        }

        Ok(inputs)
    }
}
