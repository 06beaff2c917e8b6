//! End-to-end runs through the public executor API

use langgraph_core::checkpoint::{CheckpointConfig, InMemoryCheckpointSaver};
use langgraph_core::{
    node_key, AppendReducer, EventSink, ExecutionEvent, InterruptConfig, NodeContext, NodeError,
    Route, Send, StateGraph, StateSchema, Target,
};
use serde_json::{json, Value};
use std::sync::Arc;

node_key! {
    enum Step {
        Draft => "draft",
        Fan => "fan",
        Collect => "collect",
    }
}

fn schema() -> StateSchema {
    StateSchema::new()
        .with_field("notes", Box::new(AppendReducer))
        .with_default("notes", json!([]))
}

fn graph_with_review(saver: Arc<InMemoryCheckpointSaver>) -> langgraph_core::CompiledGraph<Step> {
    let mut graph = StateGraph::new(schema());
    graph
        .add_node(Step::Draft, |s: Value, ctx: NodeContext| async move {
            ctx.custom(json!({"status": "drafting"}));
            let parts = s["parts"].as_u64().unwrap_or(2);
            Ok::<_, NodeError>(json!({"notes": ["draft"], "parts": parts}))
        })
        .add_node(Step::Fan, |input: Value, ctx: NodeContext| async move {
            let part = input["part"].as_u64().unwrap_or_default();
            ctx.emit_token(format!("part-{part}"));
            Ok::<_, NodeError>(json!({"notes": [format!("part {part}")]}))
        })
        .add_node(Step::Collect, |s: Value, _ctx: NodeContext| async move {
            let n = s["notes"].as_array().map(Vec::len).unwrap_or(0);
            Ok::<_, NodeError>(json!({"total": n}))
        })
        .set_entry_point(Step::Draft)
        .add_conditional_edge(Step::Draft, |state: &Value| {
            let parts = state["parts"].as_u64().unwrap_or(0);
            Route::Sends((0..parts).map(|part| Send::new(Step::Fan, json!({"part": part}))).collect())
        })
        .add_edge(Step::Fan, Step::Collect)
        .add_edge(Step::Collect, Target::End);

    graph
        .compile_with(saver, InterruptConfig::new().with_interrupt_after(vec![Step::Draft]))
        .unwrap()
}

#[tokio::test]
async fn test_paused_snapshot_survives_completion() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let graph = graph_with_review(saver);
    let config = CheckpointConfig::for_thread("history");

    let paused = graph
        .invoke_with_config(Some(json!({"parts": 3})), &config, EventSink::discard())
        .await
        .unwrap();
    assert_eq!(paused.interrupted_after(), Some(Step::Draft));
    assert_eq!(graph.get_state(&config).await.unwrap().unwrap().next.len(), 3);

    let done = graph.resume(&config, EventSink::discard()).await.unwrap();
    assert!(!done.is_interrupted());
    assert_eq!(done.state()["total"], 4);

    let history = graph.get_state_history(&config, None).await.unwrap();
    assert!(history.first().is_some_and(|s| s.next.is_empty()));
    assert!(history.iter().any(|s| s.interrupted_after == Some(Step::Draft)));
}

#[tokio::test]
async fn test_update_without_node_keeps_pending_tasks() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let graph = graph_with_review(saver);
    let config = CheckpointConfig::for_thread("keep-next");

    graph
        .invoke_with_config(Some(json!({"parts": 2})), &config, EventSink::discard())
        .await
        .unwrap();
    graph
        .update_state(&config, json!({"notes": ["reviewed"]}), None)
        .await
        .unwrap();

    let snapshot = graph.get_state(&config).await.unwrap().unwrap();
    assert_eq!(snapshot.next, vec![Step::Fan, Step::Fan]);
    assert_eq!(snapshot.values["notes"], json!(["draft", "reviewed"]));

    let done = graph.resume(&config, EventSink::discard()).await.unwrap();
    assert_eq!(done.state()["total"], 4);
}

#[tokio::test]
async fn test_telemetry_brackets_every_node() {
    let saver = Arc::new(InMemoryCheckpointSaver::new());
    let graph = graph_with_review(saver);
    let config = CheckpointConfig::for_thread("telemetry");

    let (sink, mut rx) = EventSink::channel();
    graph
        .invoke_with_config(Some(json!({"parts": 2})), &config, sink)
        .await
        .unwrap();
    let (sink, mut resumed_rx) = EventSink::channel();
    graph.resume(&config, sink).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    while let Ok(event) = resumed_rx.try_recv() {
        events.push(event);
    }

    let starts = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::NodeStart { .. }))
        .count();
    let ends = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::NodeEnd { .. }))
        .count();
    assert_eq!(starts, 4);
    assert_eq!(ends, 4);

    let tokens: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::ModelToken { node, token } if node == "fan" => Some(token.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 2);
    assert!(events.iter().any(|e| matches!(
        e,
        ExecutionEvent::Custom { node, payload } if node == "draft" && payload["status"] == "drafting"
    )));
}
