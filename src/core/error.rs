//! Error types for flow construction and input resolution

use crate::core::task::TaskId;
use thiserror::Error;

/// Errors raised while building a flow graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Task not found in flow: {0}")]
    UnknownTask(TaskId),

    #[error("Duplicate task name: {0}")]
    DuplicateTaskName(String),

    #[error("Edge '{upstream}' -> '{downstream}' would create a cycle")]
    Cycle { upstream: String, downstream: String },

    #[error("Parameter '{0}' cannot depend on other tasks")]
    ParameterHasUpstream(String),

    #[error("Task '{task}' already binds keyword '{key}'")]
    DuplicateKeyword { task: String, key: String },
}

/// Why a task's inputs could not be resolved
///
/// These never mark the task itself as failed: the task stays `Pending`
/// ("could not be attempted") and the error is surfaced on the flow state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Required parameter not provided: '{name}'")]
    MissingParameter { name: String },

    #[error("Input '{key}' of task '{task}' is unusable: upstream task '{upstream}' is {state}")]
    UnusableUpstream {
        task: String,
        key: String,
        upstream: String,
        state: String,
    },
}
