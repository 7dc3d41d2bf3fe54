//! Test: Resume - carrying task states into a later run

use crate::helpers::*;
use serde_json::json;
use std::collections::HashMap;
use taskflow::core::{Flow, State, Task};
use taskflow::execution::RunOptions;
use taskflow::persistence::RunSnapshot;

/// A finished incoming flow state short-circuits every task
#[tokio::test]
async fn test_finished_flow_state_short_circuits() {
    for incoming in [State::success(), State::failed("earlier")] {
        let mut flow = Flow::new("done");
        let a = flow
            .add_task(Task::from_fn("a", |_| panic!("a must not run")))
            .unwrap();
        let b = flow
            .add_task(Task::from_fn("b", |_| panic!("b must not run")))
            .unwrap();
        flow.add_edge(a, b, None).unwrap();

        let result = run_all_with(flow, RunOptions::new().with_state(incoming.clone())).await;

        assert_eq!(result.result.state, incoming);
        assert_eq!(result.state("a"), &State::pending());
        assert_eq!(result.state("b"), &State::pending());
        assert!(result.execution_order().is_empty());
    }
}

/// A pending incoming flow state is not a reason to skip anything
#[tokio::test]
async fn test_pending_flow_state_runs() {
    let mut flow = Flow::new("pending");
    flow.add_task(returns("a", json!(1))).unwrap();

    let result = run_all_with(flow, RunOptions::new().with_state(State::pending())).await;
    assert_flow_succeeded(&result);
}

/// Finished task states are carried over without re-running
#[tokio::test]
async fn test_carried_states_are_kept() {
    let mut flow = Flow::new("carry");
    let (a_task, a_calls) = counting("a");
    let a = flow.add_task(a_task).unwrap();
    let b = flow
        .add_task(Task::from_fn("b", |inputs| {
            Ok(json!(inputs.value::<i64>("n")? + 100))
        }))
        .unwrap();
    flow.add_edge(a, b, Some("n")).unwrap();

    let mut carried = HashMap::new();
    carried.insert(a, State::success().with_data(json!(5)).with_cached(true));

    let result = run_all_with(flow, RunOptions::new().with_task_states(carried)).await;

    assert_flow_succeeded(&result);
    assert_eq!(a_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(result.state("a").cached);
    assert_eq!(result.state("b").data, Some(json!(105)));
    assert_execution_order(&result, &["b"]);
}

/// A pending run's snapshot resumes against a rebuilt flow
#[tokio::test]
async fn test_resume_from_snapshot() {
    let build = |fail_first: bool| {
        let mut flow = Flow::new("resumable");
        let fetch = flow.add_task(returns("fetch", json!([1, 2, 3]))).unwrap();
        let sum = flow
            .add_task(
                Task::from_fn("sum", move |inputs| {
                    if fail_first {
                        return Err(anyhow::anyhow!("database locked").into());
                    }
                    let values: Vec<i64> = inputs.value("values")?;
                    Ok(json!(values.iter().sum::<i64>()))
                })
                .with_max_retries(1),
            )
            .unwrap();
        flow.add_edge(fetch, sum, Some("values")).unwrap();
        flow
    };

    let flow = build(true);
    let first = run_all(flow).await;
    assert_flow_pending(&first);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    RunSnapshot::capture(&first.flow, &first.result)
        .save(&path)
        .await
        .unwrap();

    let rebuilt = build(false);
    let snapshot = RunSnapshot::load(&path).await.unwrap();
    let carried = snapshot.task_states_for(&rebuilt).unwrap();

    let second = run_all_with(rebuilt, RunOptions::new().with_task_states(carried)).await;

    assert_flow_succeeded(&second);
    assert_eq!(second.state("sum").data, Some(json!(6)));
    assert_execution_order(&second, &["sum"]);
}
