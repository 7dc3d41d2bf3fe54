//! Flow runner - orchestrates a whole flow run and aggregates its outcome

use crate::{
    core::{Flow, InputError, Parameters, State, TaskContext, TaskId},
    execution::{
        events::{EventEmitter, ExecutionEvent},
        scheduler::{ExecutionScheduler, SchedulingStrategy},
        task_runner::{TaskRun, TaskRunner},
    },
};
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Inputs to a flow run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Incoming flow state; a finished one makes the run a no-op
    pub state: Option<State>,

    /// Carried-forward task states, overriding the initial `Pending`
    pub task_states: HashMap<TaskId, State>,

    /// Parameter values by name
    pub parameters: Parameters,

    /// Tasks whose final states are echoed in the result
    pub return_tasks: HashSet<TaskId>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_task_states(mut self, task_states: HashMap<TaskId, State>) -> Self {
        self.task_states = task_states;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn return_tasks(mut self, tasks: impl IntoIterator<Item = TaskId>) -> Self {
        self.return_tasks.extend(tasks);
        self
    }
}

/// Outcome of a flow run
#[derive(Debug, Clone, PartialEq)]
pub struct FlowState {
    /// Identifies this run in logs and events
    pub run_id: Uuid,

    /// `Success`, `Failed` or `Pending`
    pub state: State,

    /// States of the requested tasks
    pub data: HashMap<TaskId, State>,

    /// Tasks that could not be attempted, in dependency order
    pub errors: Vec<(TaskId, InputError)>,
}

impl FlowState {
    pub fn is_successful(&self) -> bool {
        self.state.is_successful()
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn message(&self) -> Option<&str> {
        self.state.message.as_deref()
    }

    /// State of a requested task
    pub fn task_state(&self, id: TaskId) -> Option<&State> {
        self.data.get(&id)
    }
}

/// Runs every task of a flow and folds the results into one flow state
///
/// The flow graph is shared and never mutated, so several runs over the same
/// flow may proceed concurrently; each run owns its own state mapping.
#[derive(Clone)]
pub struct FlowRunner {
    flow: Arc<Flow>,
    scheduler: ExecutionScheduler,
    events: EventEmitter,
}

impl FlowRunner {
    pub fn new(flow: Arc<Flow>) -> Self {
        Self {
            flow,
            scheduler: ExecutionScheduler::default(),
            events: EventEmitter::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: SchedulingStrategy) -> Self {
        self.scheduler = ExecutionScheduler::new(strategy);
        self
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
        self
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// Run the flow once: at most one attempt per task
    pub async fn run(&self, options: RunOptions) -> FlowState {
        let run_id = Uuid::new_v4();
        let flow = &self.flow;

        info!("Starting flow run: {} ({})", flow.name, run_id);
        self.events.emit(ExecutionEvent::FlowStarted {
            run_id,
            flow_name: flow.name.clone(),
        });

        if let Some(state) = options.state.filter(|s| s.is_finished()) {
            info!("Flow {} is already {}, nothing to run", flow.name, state.name());
            let data = options
                .return_tasks
                .iter()
                .map(|id| (*id, State::pending()))
                .collect();
            return self.finish(run_id, state, data, Vec::new());
        }

        let mut states: HashMap<TaskId, State> = flow
            .tasks()
            .map(|task| {
                let state = options
                    .task_states
                    .get(&task.id())
                    .cloned()
                    .unwrap_or_default();
                (task.id(), state)
            })
            .collect();

        let parameters = Arc::new(options.parameters);
        let order = flow.sorted_tasks();
        let mut evaluated = HashSet::new();
        let mut errors = Vec::new();

        loop {
            let batch = self.scheduler.next_batch(flow, &order, &evaluated);
            if batch.is_empty() {
                break;
            }

            debug!("Evaluating {} task(s)", batch.len());
            for (id, run) in self.evaluate_batch(&batch, &states, &parameters).await {
                self.report(id, &run);
                evaluated.insert(id);
                states.insert(id, run.state);
                if let Some(error) = run.error {
                    errors.push((id, error));
                }
            }
        }

        errors.sort_by_key(|(id, _)| order.iter().position(|o| o == id));

        let state = self.aggregate(&states, &errors);
        let data = states
            .into_iter()
            .filter(|(id, _)| options.return_tasks.contains(id))
            .collect();

        self.finish(run_id, state, data, errors)
    }

    /// Re-run while the flow is pending on retries, waiting out each retry delay
    ///
    /// Stops once the flow settles, after `max_passes` runs, or when nothing
    /// pending has a start time to wait for.
    pub async fn run_until_settled(&self, options: RunOptions, max_passes: usize) -> FlowState {
        let requested = options.return_tasks.clone();
        let mut options = options.return_tasks(self.flow.tasks().map(|t| t.id()));
        let mut pass = 1;

        loop {
            let mut result = self.run(options.clone()).await;

            let next_start = result
                .data
                .values()
                .filter(|s| s.is_retrying())
                .filter_map(|s| s.start_time())
                .min();

            let done = !result.is_pending() || pass >= max_passes.max(1);
            match next_start {
                Some(start) if !done => {
                    let delay = (start - Utc::now()).to_std().unwrap_or_default();
                    info!(
                        "Flow {} pending on retries, pass {} of {}, waiting {:?}",
                        self.flow.name, pass, max_passes, delay
                    );
                    tokio::time::sleep(delay).await;
                    options.task_states = result.data;
                    options.state = None;
                    pass += 1;
                }
                _ => {
                    result.data.retain(|id, _| requested.contains(id));
                    return result;
                }
            }
        }
    }

    /// Evaluate a batch of independent tasks, each on its own upstream snapshot
    async fn evaluate_batch(
        &self,
        batch: &[TaskId],
        states: &HashMap<TaskId, State>,
        parameters: &Arc<Parameters>,
    ) -> Vec<(TaskId, TaskRun)> {
        let mut handles = Vec::with_capacity(batch.len());

        for &id in batch {
            let Some(task) = self.flow.task(id) else {
                continue;
            };
            let context = TaskContext::for_task(&self.flow, id, states, parameters.clone());
            let state = states.get(&id).cloned().unwrap_or_default();
            let runner = TaskRunner::new(task.clone()).with_events(self.events.clone());

            let handle = tokio::spawn(async move { runner.run(state, &context).await });
            handles.push((id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let run = match handle.await {
                Ok(run) => run,
                Err(e) => {
                    error!("Task runner for {} did not complete: {}", id, e);
                    TaskRun {
                        state: State::failed(format!("Task runner did not complete: {}", e)),
                        error: None,
                    }
                }
            };
            results.push((id, run));
        }

        results
    }

    fn report(&self, id: TaskId, run: &TaskRun) {
        let task_name = self
            .flow
            .task(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string());

        let event = if let Some(error) = &run.error {
            ExecutionEvent::TaskBlocked {
                task_id: id,
                task_name,
                reason: error.to_string(),
            }
        } else if let Some(start_time) = run.state.start_time().filter(|_| run.state.is_retrying()) {
            ExecutionEvent::TaskRetrying {
                task_id: id,
                task_name,
                run_count: run.state.run_count(),
                start_time,
            }
        } else if run.state.is_finished() {
            ExecutionEvent::TaskFinished {
                task_id: id,
                task_name,
                state: run.state.clone(),
            }
        } else {
            ExecutionEvent::TaskBlocked {
                task_id: id,
                task_name,
                reason: "waiting on unfinished upstream tasks".to_string(),
            }
        };

        self.events.emit(event);
    }

    /// Fold task states into the flow's state
    ///
    /// Only terminal tasks (those without downstream dependents) count, so a
    /// failure that a downstream task handles does not fail the flow.
    fn aggregate(&self, states: &HashMap<TaskId, State>, errors: &[(TaskId, InputError)]) -> State {
        if let Some((_, error)) = errors.first() {
            return State::failed(error.to_string());
        }

        let terminal: Vec<State> = self
            .flow
            .terminal_tasks()
            .into_iter()
            .map(|id| states.get(&id).cloned().unwrap_or_default())
            .collect();

        if terminal.iter().all(State::is_successful) {
            State::success().with_message("All terminal tasks succeeded.")
        } else if terminal.iter().any(|s| !s.is_finished()) {
            State::pending().with_message("Some terminal tasks are still pending.")
        } else {
            State::failed("Some terminal tasks failed.")
        }
    }

    fn finish(
        &self,
        run_id: Uuid,
        state: State,
        data: HashMap<TaskId, State>,
        errors: Vec<(TaskId, InputError)>,
    ) -> FlowState {
        info!("Flow run finished: {} - {}", self.flow.name, state);
        self.events.emit(ExecutionEvent::FlowFinished {
            run_id,
            state: state.clone(),
        });

        FlowState {
            run_id,
            state,
            data,
            errors,
        }
    }
}
