//! Test utility functions for taskflow

#![allow(dead_code)]

use taskflow::core::{Flow, State, Task, TaskId};
use taskflow::execution::{ExecutionEvent, FlowRunner, FlowState, RunOptions, SchedulingStrategy};

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A task that always returns `value`
pub fn returns(name: &str, value: Value) -> Task {
    Task::constant(name, value)
}

/// A task that always raises an error with `message`
pub fn raises(name: &str, message: &str) -> Task {
    let message = message.to_string();
    Task::from_fn(name, move |_| Err(anyhow::anyhow!("{}", message).into()))
}

/// A task that counts its invocations and returns the count so far
pub fn counting(name: &str) -> (Task, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let task = Task::from_fn(name, move |_| {
        Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) + 1))
    });
    (task, calls)
}

/// Result of a flow run plus everything observed while it ran
pub struct FlowTestResult {
    pub flow: Arc<Flow>,
    pub result: FlowState,
    pub events: Vec<ExecutionEvent>,
}

impl FlowTestResult {
    pub fn is_success(&self) -> bool {
        self.result.is_successful()
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_failed()
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_pending()
    }

    pub fn id(&self, name: &str) -> TaskId {
        self.flow
            .task_by_name(name)
            .unwrap_or_else(|| panic!("No task named {}", name))
            .id()
    }

    /// State of a returned task, by name
    pub fn state(&self, name: &str) -> &State {
        let id = self.id(name);
        self.result
            .data
            .get(&id)
            .unwrap_or_else(|| panic!("Task {} was not returned", name))
    }

    /// Task names in the order their bodies started
    pub fn execution_order(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ExecutionEvent::TaskStarted { task_name, .. } => Some(task_name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_task_attempts(&self, name: &str) -> usize {
        self.execution_order().iter().filter(|n| *n == name).count()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Flow {}: {}", self.flow.name, self.result.state)];
        for task in self.flow.tasks() {
            if let Some(state) = self.result.data.get(&task.id()) {
                lines.push(format!("  {}: {}", task.name, state));
            }
        }
        lines.join("\n")
    }
}

/// Run a flow, recording events
pub async fn run_flow_with(
    flow: Flow,
    options: RunOptions,
    strategy: SchedulingStrategy,
) -> FlowTestResult {
    let flow = Arc::new(flow);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let runner = FlowRunner::new(flow.clone())
        .with_strategy(strategy)
        .with_event_handler(move |event| sink.lock().unwrap().push(event));
    let result = runner.run(options).await;

    let events = events.lock().unwrap().clone();
    FlowTestResult {
        flow,
        result,
        events,
    }
}

/// Run a flow sequentially, returning every task's state
pub async fn run_all(flow: Flow) -> FlowTestResult {
    run_all_with(flow, RunOptions::new()).await
}

/// Run a flow sequentially with extra options, returning every task's state
pub async fn run_all_with(flow: Flow, options: RunOptions) -> FlowTestResult {
    let all: Vec<TaskId> = flow.tasks().map(|t| t.id()).collect();
    run_flow_with(flow, options.return_tasks(all), SchedulingStrategy::Sequential).await
}

pub fn assert_flow_succeeded(result: &FlowTestResult) {
    assert!(
        result.is_success(),
        "Flow should have succeeded:\n{}",
        result.summary()
    );
}

pub fn assert_flow_failed(result: &FlowTestResult) {
    assert!(
        result.is_failed(),
        "Flow should have failed:\n{}",
        result.summary()
    );
}

pub fn assert_flow_pending(result: &FlowTestResult) {
    assert!(
        result.is_pending(),
        "Flow should be pending:\n{}",
        result.summary()
    );
}

pub fn assert_execution_order(result: &FlowTestResult, expected: &[&str]) {
    let actual = result.execution_order();
    assert_eq!(
        actual, expected,
        "Execution order mismatch:\n{}",
        result.summary()
    );
}
