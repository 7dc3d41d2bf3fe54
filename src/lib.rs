//! taskflow - a dependency-aware DAG task execution engine
//!
//! Tasks are wired into a [`Flow`]; a [`FlowRunner`] evaluates them in
//! dependency order, asking each task's [`Trigger`] whether it may run,
//! turning results and raised [`Signal`]s into [`State`]s, scheduling
//! retries, and folding the terminal task states into one flow state.

pub mod cli;
pub mod command;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use crate::command::ShellTask;
pub use crate::core::{
    Flow, FlowError, InputError, Inputs, Signal, State, StateKind, Task, TaskBody, TaskError,
    TaskId, TaskResult, Trigger,
};
pub use crate::execution::{
    ExecutionEvent, FlowRunner, FlowState, RunOptions, SchedulingStrategy, TaskRunner,
};
pub use crate::persistence::RunSnapshot;
