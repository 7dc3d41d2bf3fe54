//! Signals: control values a task body raises to choose its own outcome

use crate::core::state::State;
use serde_json::Value;
use thiserror::Error;

/// A requested outcome, honored over whatever the body would naturally produce
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Signal {
    #[error("SUCCESS signal raised")]
    Success,

    #[error("{0}")]
    Fail(String),

    #[error("SKIP signal raised")]
    Skip,

    #[error("RETRY signal raised")]
    Retry,
}

/// Error path of a task body
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Signal(#[from] Signal),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What a task body returns
pub type TaskResult = Result<Value, TaskError>;

/// A body's result after signal interception
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    pub state: State,
    /// Set by `RETRY`: retry even when the budget is spent
    pub force_retry: bool,
}

impl Handled {
    fn settled(state: State) -> Self {
        Self {
            state,
            force_retry: false,
        }
    }
}

/// Convert a body's result into a state
pub fn handle(result: TaskResult) -> Handled {
    match result {
        Ok(data) => Handled::settled(State::success().with_data(data)),
        Err(TaskError::Signal(Signal::Success)) => Handled::settled(State::success()),
        Err(TaskError::Signal(Signal::Fail(message))) => Handled::settled(State::failed(message)),
        Err(TaskError::Signal(Signal::Skip)) => Handled::settled(State::skipped()),
        Err(TaskError::Signal(Signal::Retry)) => Handled {
            state: State::failed(Signal::Retry.to_string()),
            force_retry: true,
        },
        Err(TaskError::Other(error)) => Handled::settled(State::failed(format!("{:#}", error))),
    }
}
