//! Test: Retry Behavior - failures within budget become retries

use crate::helpers::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskflow::core::{Flow, Signal, State, Task};
use taskflow::execution::{FlowRunner, RunOptions};

/// An always-failing task with a retry left ends the run retrying
#[tokio::test]
async fn test_failure_with_budget_is_retrying() {
    let mut flow = Flow::new("retry");
    flow.add_task(raises("flaky", "nope").with_max_retries(1))
        .unwrap();

    let result = run_all(flow).await;

    assert_flow_pending(&result);
    let state = result.state("flaky");
    assert!(state.is_retrying());
    assert!(!state.is_failed());
    assert_eq!(state.run_count(), 1);
    assert_eq!(state.message.as_deref(), Some("nope"));
}

/// Feeding the retrying state back uses up the budget
#[tokio::test]
async fn test_retry_budget_exhausted() {
    let mut flow = Flow::new("exhaust");
    let id = flow
        .add_task(raises("flaky", "nope").with_max_retries(1))
        .unwrap();
    let runner = FlowRunner::new(Arc::new(flow));

    let first = runner.run(RunOptions::new().return_tasks([id])).await;
    assert!(first.is_pending());

    let second = runner
        .run(
            RunOptions::new()
                .with_task_states(first.data.clone())
                .return_tasks([id]),
        )
        .await;
    assert!(second.is_failed());
    assert!(second.data[&id].is_failed());
}

/// The retry carries its start time forward from the retry delay
#[tokio::test]
async fn test_retry_delay_sets_start_time() {
    let mut flow = Flow::new("delay");
    flow.add_task(
        raises("flaky", "nope")
            .with_max_retries(2)
            .with_retry_delay(Duration::from_secs(120)),
    )
    .unwrap();

    let before = chrono::Utc::now();
    let result = run_all(flow).await;

    let start = result.state("flaky").start_time().unwrap();
    assert!(start >= before + chrono::Duration::seconds(120));
}

/// Downstream of a retrying task stays pending
#[tokio::test]
async fn test_downstream_of_retrying_task_waits() {
    let mut flow = Flow::new("wait");
    let a = flow
        .add_task(raises("a", "nope").with_max_retries(1))
        .unwrap();
    let b = flow.add_task(returns("b", json!(1))).unwrap();
    flow.add_edge(a, b, None).unwrap();

    let result = run_all(flow).await;

    assert_flow_pending(&result);
    assert_eq!(result.state("b"), &State::pending());
    assert_execution_order(&result, &["a"]);
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, taskflow::ExecutionEvent::TaskRetrying { task_name, .. } if task_name == "a")));
}

/// RETRY retries even with no budget left
#[tokio::test]
async fn test_retry_signal_overrides_budget() {
    let mut flow = Flow::new("forced");
    flow.add_task(Task::from_fn("t", |_| Err(Signal::Retry.into())))
        .unwrap();

    let result = run_all(flow).await;

    assert_flow_pending(&result);
    assert!(result.state("t").is_retrying());
}

/// A flaky task recovers when the run is repeated until settled
#[tokio::test]
async fn test_run_until_settled_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut flow = Flow::new("settle");
    let flaky = flow
        .add_task(
            Task::from_fn("flaky", move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow::anyhow!("first attempt fails").into())
                } else {
                    Ok(json!("ok"))
                }
            })
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(10)),
        )
        .unwrap();
    let after = flow.add_task(returns("after", json!(2))).unwrap();
    flow.add_edge(flaky, after, None).unwrap();

    let result = FlowRunner::new(Arc::new(flow))
        .run_until_settled(RunOptions::new().return_tasks([after]), 5)
        .await;

    assert!(result.is_successful());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.data.len(), 1);
    assert!(result.data[&after].is_successful());
}
