use crate::error::{GraphError, NodeError};
use crate::graph::Target;
use crate::interrupt::InterruptConfig;
use crate::node_key;
use crate::send::{Route, Send};
use crate::state::{AppendReducer, KeepNonEmptyReducer, StateSchema};
use crate::stream::{EventSink, ExecutionEvent, NodeContext};
use crate::{RunOutcome, StateGraph};
use langgraph_checkpoint::{CheckpointConfig, CheckpointSaver, InMemoryCheckpointSaver};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

node_key! {
    enum Key {
        Plan => "plan",
        Work => "work",
        Review => "review",
        Finish => "finish",
    }
}

type NodeResult = std::result::Result<Value, NodeError>;

fn schema() -> StateSchema {
    StateSchema::new()
        .with_field("log", Box::new(AppendReducer))
        .with_field("topic", Box::new(KeepNonEmptyReducer))
        .with_default("log", json!([]))
}

#[tokio::test]
async fn test_linear_run_merges_partial_updates() {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Plan, |_s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({"log": ["plan"], "count": 1}))
        })
        .add_node(Key::Finish, |s: Value, _c: NodeContext| async move {
            let count = s["count"].as_i64().unwrap_or(0);
            Ok::<_, NodeError>(json!({"log": ["finish"], "count": count + 1}))
        })
        .set_entry_point(Key::Plan)
        .add_edge(Key::Plan, Key::Finish)
        .add_edge(Key::Finish, Target::End);

    let outcome = graph.compile().unwrap().invoke(json!({"topic": "t"})).await.unwrap();
    let state = outcome.into_state();
    assert_eq!(state["log"], json!(["plan", "finish"]));
    assert_eq!(state["count"], 2);
    assert_eq!(state["topic"], "t");
}

#[tokio::test]
async fn test_send_fan_out_converges_through_reducer() {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Plan, |_s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({"items": ["a", "b", "c"]}))
        })
        .add_node(Key::Work, |input: Value, _c: NodeContext| async move {
            let item = input["item"].as_str().unwrap_or_default().to_string();
            Ok::<_, NodeError>(json!({"log": [item]}))
        })
        .add_node(Key::Finish, |s: Value, _c: NodeContext| async move {
            let n = s["log"].as_array().map(|a| a.len()).unwrap_or(0);
            Ok::<_, NodeError>(json!({"seen": n}))
        })
        .set_entry_point(Key::Plan)
        .add_conditional_edge(Key::Plan, |state: &Value| {
            let sends = state["items"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|item| Send::new(Key::Work, json!({"item": item})))
                .collect();
            Route::Sends(sends)
        })
        .add_edge(Key::Work, Key::Finish)
        .add_edge(Key::Finish, Target::End);

    let finish_runs = Arc::new(AtomicUsize::new(0));
    let (sink, mut rx) = EventSink::channel();
    let outcome = graph
        .compile()
        .unwrap()
        .invoke_with_config(Some(json!({})), &CheckpointConfig::default(), sink)
        .await
        .unwrap();

    let state = outcome.into_state();
    assert_eq!(state["log"], json!(["a", "b", "c"]));
    assert_eq!(state["seen"], 3);

    while let Ok(event) = rx.try_recv() {
        if let ExecutionEvent::NodeStart { node, .. } = event {
            if node == "finish" {
                finish_runs.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
    assert_eq!(finish_runs.load(Ordering::SeqCst), 1);
}

fn review_graph(saver: Arc<InMemoryCheckpointSaver>, plan_calls: Arc<AtomicUsize>) -> crate::CompiledGraph<Key> {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Plan, move |s: Value, _c: NodeContext| {
            let plan_calls = plan_calls.clone();
            async move {
                let n = plan_calls.fetch_add(1, Ordering::SeqCst) + 1;
                let feedback = s["feedback"].as_str().unwrap_or_default().to_string();
                Ok::<_, NodeError>(json!({"plan": format!("plan v{n} {feedback}").trim().to_string()}))
            }
        })
        .add_node(Key::Work, |s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({"log": [s["plan"].clone()], "feedback": null}))
        })
        .set_entry_point(Key::Plan)
        .add_conditional_edge(Key::Plan, |state: &Value| {
            match state["feedback"].as_str().unwrap_or_default() {
                "" | "ok" => Route::Goto(Key::Work),
                _ => Route::Goto(Key::Plan),
            }
        })
        .add_edge(Key::Work, Target::End);

    graph
        .compile_with(saver, InterruptConfig::new().with_interrupt_after(vec![Key::Plan]))
        .unwrap()
}

#[tokio::test]
async fn test_interrupt_then_approve_advances_without_replanning() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let graph = review_graph(saver.clone(), calls.clone());
    let config = CheckpointConfig::for_thread("t-approve");

    let outcome = graph
        .invoke_with_config(Some(json!({"topic": "x"})), &config, EventSink::discard())
        .await
        .unwrap();
    assert_eq!(outcome.interrupted_after(), Some(Key::Plan));

    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert!(snapshot.is_paused());
    assert_eq!(snapshot.next, vec![Key::Work]);

    graph
        .update_state(&config, json!({"feedback": "ok", "topic": ""}), Some(Key::Plan))
        .await
        .unwrap();
    let outcome = graph.resume(&config, EventSink::discard()).await.unwrap();

    let state = outcome.into_state();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state["log"], json!(["plan v1"]));
    assert_eq!(state["topic"], "x");
}

#[tokio::test]
async fn test_interrupt_then_feedback_reenters_node() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let graph = review_graph(saver, calls.clone());
    let config = CheckpointConfig::for_thread("t-revise");

    graph
        .invoke_with_config(Some(json!({"topic": "x"})), &config, EventSink::discard())
        .await
        .unwrap();

    graph
        .update_state(&config, json!({"feedback": "add y"}), Some(Key::Plan))
        .await
        .unwrap();
    let outcome = graph.resume(&config, EventSink::discard()).await.unwrap();

    // planner ran again and paused again
    assert_eq!(outcome.interrupted_after(), Some(Key::Plan));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.state()["plan"], "plan v2 add y");
    assert_eq!(outcome.state()["topic"], "x");
}

#[tokio::test]
async fn test_resume_unknown_thread_fails() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let graph = review_graph(saver, Arc::new(AtomicUsize::new(0)));
    let err = graph
        .resume(&CheckpointConfig::for_thread("missing"), EventSink::discard())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Execution(_)));
}

#[tokio::test]
async fn test_node_failure_keeps_last_checkpoint() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Plan, |_s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({"log": ["planned"]}))
        })
        .add_node(Key::Work, |_s: Value, _c: NodeContext| async move {
            Err::<Value, NodeError>("tool exploded".into())
        })
        .set_entry_point(Key::Plan)
        .add_edge(Key::Plan, Key::Work)
        .add_edge(Key::Work, Target::End);
    let graph = graph.compile().unwrap().with_checkpointer(saver.clone());
    let config = CheckpointConfig::for_thread("t-fail");

    let err = graph
        .invoke_with_config(Some(json!({})), &config, EventSink::discard())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeExecution { ref node, .. } if node == "work"));

    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(snapshot.values["log"], json!(["planned"]));
    assert_eq!(snapshot.next, vec![Key::Work]);
    assert!(saver.get(&config).await.unwrap().is_some());
}

#[tokio::test]
async fn test_recursion_limit_stops_cycles() {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Review, |_s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({}))
        })
        .set_entry_point(Key::Review)
        .add_conditional_edge(Key::Review, |_state: &Value| Route::Goto(Key::Review));

    let err = graph
        .compile()
        .unwrap()
        .with_recursion_limit(5)
        .invoke(json!({}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("recursion limit"));
}

#[tokio::test]
async fn test_recursion_limit_is_per_invocation() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let graph = review_graph(saver.clone(), calls.clone()).with_recursion_limit(3);
    let config = CheckpointConfig::for_thread("t-many-rounds");

    graph
        .invoke_with_config(Some(json!({"topic": "x"})), &config, EventSink::discard())
        .await
        .unwrap();

    // more review rounds than the limit allows in one run
    for round in 0..5 {
        graph
            .update_state(&config, json!({"feedback": format!("round {round}")}), Some(Key::Plan))
            .await
            .unwrap();
        let outcome = graph.resume(&config, EventSink::discard()).await.unwrap();
        assert_eq!(outcome.interrupted_after(), Some(Key::Plan));
    }

    graph
        .update_state(&config, json!({"feedback": "ok"}), Some(Key::Plan))
        .await
        .unwrap();
    let outcome = graph.resume(&config, EventSink::discard()).await.unwrap();
    assert!(!outcome.is_interrupted());
    assert_eq!(calls.load(Ordering::SeqCst), 6);

    // checkpoint steps still grow across resumes
    let tuple = saver.get_tuple(&config).await.unwrap().unwrap();
    assert!(tuple.metadata.step.unwrap_or_default() >= 3);
}

#[tokio::test]
async fn test_completed_thread_resume_returns_final_state() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Key::Finish, |_s: Value, _c: NodeContext| async move {
            Ok::<_, NodeError>(json!({"done": true}))
        })
        .set_entry_point(Key::Finish)
        .add_edge(Key::Finish, Target::End);
    let graph = graph.compile().unwrap().with_checkpointer(saver);
    let config = CheckpointConfig::for_thread("t-done");

    graph
        .invoke_with_config(Some(json!({})), &config, EventSink::discard())
        .await
        .unwrap();
    let again = graph.resume(&config, EventSink::discard()).await.unwrap();
    assert!(matches!(again, RunOutcome::Complete(ref s) if s["done"] == true));
}
