//! Task runner - evaluates a single task against a snapshot of its upstream

use crate::{
    core::{
        signal::{self, Handled},
        InputError, Inputs, State, Task, TaskBody, TaskContext, TaskKind, TriggerDecision,
    },
    execution::events::{EventEmitter, ExecutionEvent},
};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Result of evaluating a task once
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRun {
    /// The task's new state
    pub state: State,

    /// Set when the task could not be attempted; its state is then unchanged
    pub error: Option<InputError>,
}

impl TaskRun {
    fn settled(state: State) -> Self {
        Self { state, error: None }
    }

    fn unresolved(state: State, error: InputError) -> Self {
        Self {
            state,
            error: Some(error),
        }
    }
}

/// Executes one task: parameter resolution, triggering, running, signal
/// handling and retry scheduling
#[derive(Clone)]
pub struct TaskRunner {
    task: Arc<Task>,
    events: EventEmitter,
}

impl TaskRunner {
    pub fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            events: EventEmitter::default(),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Evaluate the task given its current state
    ///
    /// Never fails: errors from the task body become `Failed` states, and
    /// input problems leave the state untouched and are reported alongside.
    pub async fn run(&self, state: State, context: &TaskContext) -> TaskRun {
        let task = &self.task;

        if state.is_finished() {
            debug!("Task {} already finished ({}), not re-running", task.name, state.name());
            return TaskRun::settled(state);
        }

        let body = match &task.kind {
            TaskKind::Parameter { default } => {
                let value = context.parameter(&task.name).cloned().or_else(|| default.clone());
                return match value {
                    Some(value) => TaskRun::settled(State::success().with_data(value)),
                    None => {
                        warn!("Parameter {} was not provided", task.name);
                        TaskRun::unresolved(
                            state,
                            InputError::MissingParameter {
                                name: task.name.clone(),
                            },
                        )
                    }
                };
            }
            TaskKind::Body(body) => body.clone(),
        };

        match task.trigger.evaluate(&context.upstream) {
            TriggerDecision::Wait => {
                debug!("Task {} is waiting on unfinished upstream tasks", task.name);
                return TaskRun::settled(state);
            }
            TriggerDecision::Deny(reason) => {
                info!("Task {} not run: {}", task.name, reason);
                return TaskRun::settled(State::trigger_failed(reason));
            }
            TriggerDecision::Run => {}
        }

        let inputs = match context.resolve_inputs() {
            Ok(inputs) => inputs,
            Err(error) => {
                warn!("Task {} could not resolve its inputs: {}", task.name, error);
                return TaskRun::unresolved(state, error);
            }
        };

        let run_count = state.run_count() + 1;
        self.events.emit(ExecutionEvent::TaskStarted {
            task_id: task.id(),
            task_name: task.name.clone(),
            attempt: run_count,
        });
        info!("Running task {} (attempt {})", task.name, run_count);

        let handled = self.invoke(body, inputs).await;

        if handled.force_retry || (handled.state.is_failed() && run_count <= task.max_retries) {
            // Saturates for delays past the representable range
            let start_time = chrono::Duration::from_std(task.retry_delay)
                .ok()
                .and_then(|delay| Utc::now().checked_add_signed(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let mut retrying = State::retrying(run_count, start_time);
            retrying.message = handled.state.message;
            info!(
                "Task {} will retry (run {} of {} allowed retries)",
                task.name, run_count, task.max_retries
            );
            return TaskRun::settled(retrying);
        }

        TaskRun::settled(handled.state)
    }

    /// Run the body in its own tokio task so panics and timeouts are contained
    async fn invoke(&self, body: Arc<dyn TaskBody>, inputs: Inputs) -> Handled {
        let handle = tokio::spawn(async move { body.run(inputs).await });
        let abort = handle.abort_handle();

        let joined = match self.task.timeout {
            Some(limit) => match timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    warn!("Task {} timed out after {:?}", self.task.name, limit);
                    return signal::handle(Err(anyhow::anyhow!(
                        "Timeout after {:?}",
                        limit
                    )
                    .into()));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => signal::handle(result),
            Err(error) if error.is_panic() => {
                let message = panic_message(error.into_panic());
                warn!("Task {} panicked: {}", self.task.name, message);
                signal::handle(Err(anyhow::anyhow!("Task panicked: {}", message).into()))
            }
            Err(error) => signal::handle(Err(anyhow::anyhow!("Task was cancelled: {}", error).into())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
