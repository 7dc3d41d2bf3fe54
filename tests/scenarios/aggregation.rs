//! Test: Aggregation - how task states fold into the flow's state

use crate::helpers::*;
use serde_json::json;
use taskflow::core::{Flow, Task, Trigger};
use taskflow::execution::{ExecutionEvent, RunOptions, SchedulingStrategy};

/// Without return tasks the result carries no task states
#[tokio::test]
async fn test_no_return_tasks() {
    let mut flow = Flow::new("quiet");
    let (task, calls) = counting("x");
    flow.add_task(task).unwrap();

    let result = run_flow_with(flow, RunOptions::new(), SchedulingStrategy::Sequential).await;

    assert_flow_succeeded(&result);
    assert!(result.result.data.is_empty());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

/// Only requested tasks are echoed, though all run
#[tokio::test]
async fn test_some_return_tasks() {
    let mut flow = Flow::new("partial");
    let a = flow.add_task(returns("a", json!(1))).unwrap();
    let b = flow.add_task(returns("b", json!(2))).unwrap();
    flow.add_edge(a, b, None).unwrap();

    let result = run_flow_with(
        flow,
        RunOptions::new().return_tasks([b]),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_eq!(result.result.data.len(), 1);
    assert!(result.result.data.contains_key(&b));
    assert_execution_order(&result, &["a", "b"]);
}

/// Failures handled downstream do not fail the flow
#[tokio::test]
async fn test_only_terminal_tasks_count() {
    let mut flow = Flow::new("terminal");
    let work = flow.add_task(raises("work", "boom")).unwrap();
    let notify = flow
        .add_task(returns("notify", json!("paged")).with_trigger(Trigger::all_failed()))
        .unwrap();
    let report = flow
        .add_task(returns("report", json!("done")).with_trigger(Trigger::new(
            "always",
            |_| Ok(()),
        )))
        .unwrap();
    flow.add_edge(work, notify, None).unwrap();
    flow.add_edge(work, report, None).unwrap();

    let result = run_all(flow).await;

    assert_flow_succeeded(&result);
    assert!(result.state("work").is_failed());
    assert_eq!(
        result.result.message(),
        Some("All terminal tasks succeeded.")
    );
}

/// One failed terminal task among successful ones fails the flow
#[tokio::test]
async fn test_any_failed_terminal_task_fails_flow() {
    let mut flow = Flow::new("mixed");
    flow.add_task(returns("ok", json!(1))).unwrap();
    flow.add_task(raises("bad", "boom")).unwrap();

    let result = run_all(flow).await;

    assert_flow_failed(&result);
    assert_eq!(result.result.message(), Some("Some terminal tasks failed."));
}

/// Pending beats failed: a retrying terminal task keeps the flow resumable
#[tokio::test]
async fn test_pending_terminal_task_keeps_flow_pending() {
    let mut flow = Flow::new("mixed-pending");
    flow.add_task(raises("bad", "boom")).unwrap();
    flow.add_task(raises("flaky", "nope").with_max_retries(1))
        .unwrap();

    let result = run_all(flow).await;

    assert_flow_pending(&result);
}

/// Events bracket the run
#[tokio::test]
async fn test_flow_events() {
    let mut flow = Flow::new("events");
    flow.add_task(returns("a", json!(1))).unwrap();

    let result = run_all(flow).await;

    assert!(matches!(
        result.events.first(),
        Some(ExecutionEvent::FlowStarted { flow_name, .. }) if flow_name == "events"
    ));
    match result.events.last() {
        Some(ExecutionEvent::FlowFinished { run_id, state }) => {
            assert_eq!(*run_id, result.result.run_id);
            assert!(state.is_successful());
        }
        other => panic!("Expected FlowFinished, got {:?}", other),
    }
}

/// Empty flows succeed trivially
#[tokio::test]
async fn test_empty_flow() {
    let result = run_all(Flow::new("empty")).await;
    assert_flow_succeeded(&result);
}

#[tokio::test]
async fn test_task_without_upstream_ignores_trigger_denial() {
    // An all_failed trigger with no upstream tasks has nothing to deny
    let mut flow = Flow::new("root");
    flow.add_task(Task::constant("root", json!(1)).with_trigger(Trigger::all_failed()))
        .unwrap();

    let result = run_all(flow).await;
    assert_flow_succeeded(&result);
}
