//! Test: Signals - task bodies choosing their own outcome

use crate::helpers::*;
use serde_json::json;
use std::time::Duration;
use taskflow::core::{Flow, Inputs, Signal, State, Task, TaskBody, TaskResult};

#[tokio::test]
async fn test_signals_map_to_states() {
    let mut flow = Flow::new("signals");
    flow.add_task(Task::from_fn("success", |_| Err(Signal::Success.into())))
        .unwrap();
    flow.add_task(Task::from_fn("skip", |_| Err(Signal::Skip.into())))
        .unwrap();
    flow.add_task(Task::from_fn("fail", |_| {
        Err(Signal::Fail("custom-fail-message".to_string()).into())
    }))
    .unwrap();

    let result = run_all(flow).await;

    assert_flow_failed(&result);
    assert_eq!(result.state("success"), &State::success());
    assert_eq!(result.state("skip"), &State::skipped());
    assert_eq!(result.state("fail"), &State::failed("custom-fail-message"));
}

/// Errors keep their full context chain in the failure message
#[tokio::test]
async fn test_error_context_preserved() {
    let mut flow = Flow::new("context");
    flow.add_task(Task::from_fn("t", |_| {
        let err = anyhow::anyhow!("connection refused").context("fetching data");
        Err(err.into())
    }))
    .unwrap();

    let result = run_all(flow).await;

    let message = result.state("t").message.clone().unwrap();
    assert!(message.contains("fetching data"));
    assert!(message.contains("connection refused"));
}

#[tokio::test]
async fn test_panic_is_contained() {
    let mut flow = Flow::new("panic");
    let a = flow
        .add_task(Task::from_fn("a", |_| panic!("kaboom")))
        .unwrap();
    let b = flow.add_task(returns("b", json!(1))).unwrap();
    flow.add_edge(a, b, None).unwrap();

    let result = run_all(flow).await;

    assert_flow_failed(&result);
    assert!(result.state("a").message.as_deref().unwrap().contains("kaboom"));
    assert!(result.state("b").is_trigger_failed());
}

struct Slow;

#[async_trait::async_trait]
impl TaskBody for Slow {
    async fn run(&self, _inputs: Inputs) -> TaskResult {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(json!("too late"))
    }
}

#[tokio::test]
async fn test_timeout_fails_task() {
    let mut flow = Flow::new("timeout");
    flow.add_task(Task::new("slow", Slow).with_timeout(Duration::from_millis(50)))
        .unwrap();

    let result = run_all(flow).await;

    assert_flow_failed(&result);
    assert!(result.state("slow").message.as_deref().unwrap().contains("Timeout"));
}
