//! In-process mock Hive server for client integration tests
//!
//! Serves the control-plane surface under `/api` with in-memory agents,
//! executions, sessions and checkpoints, plus an SSE event stream that
//! opens with a keepalive comment and a malformed frame.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use hive_core::{EventFilter, EventTypeName, ExecutionCommand, ExecutionState};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const DEMO_PATH: &str = "agents/demo.yaml";
pub const AWAITING_NODE: &str = "ask_user";

#[derive(Clone, Debug)]
pub struct MockExecution {
    pub agent_id: String,
    pub session_id: String,
    pub state: ExecutionState,
}

#[derive(Default)]
pub struct MockData {
    pub agents: HashMap<String, Value>,
    pub executions: HashMap<String, MockExecution>,
    /// Checkpoints per session, oldest first.
    pub checkpoints: HashMap<String, Vec<String>>,
    pub session_counter: u64,
    pub checkpoint_counter: u64,
}

pub struct MockHive {
    pub data: Mutex<MockData>,
    events: broadcast::Sender<(String, Value)>,
}

impl MockHive {
    /// Push a raw event to subscribers of `agent_id`.
    pub fn emit(&self, agent_id: &str, event: Value) {
        let _ = self.events.send((agent_id.to_string(), event));
    }

    pub fn execution_state(&self, execution_id: &str) -> Option<ExecutionState> {
        self.data
            .lock()
            .unwrap()
            .executions
            .get(execution_id)
            .map(|e| e.state)
    }

    pub fn checkpoints(&self, session_id: &str) -> Vec<String> {
        self.data
            .lock()
            .unwrap()
            .checkpoints
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    fn lifecycle_event(&self, kind: &str, exec_id: &str, exec: &MockExecution, extra: Value) {
        let mut event = json!({
            "type": kind,
            "execution_id": exec_id,
            "session_id": exec.session_id,
        });
        if let (Some(map), Value::Object(extra)) = (event.as_object_mut(), extra) {
            map.extend(extra);
        }
        self.emit(&exec.agent_id, event);
    }
}

pub struct MockServer {
    pub base_url: String,
    pub hive: Arc<MockHive>,
}

type AppState = Arc<MockHive>;

pub async fn spawn() -> MockServer {
    let (events_tx, _) = broadcast::channel(256);
    let hive = Arc::new(MockHive {
        data: Mutex::new(MockData::default()),
        events: events_tx,
    });

    let api = Router::new()
        .route("/discover", get(discover))
        .route("/agents", get(list_agents).post(load_agent))
        .route("/agents/:id", get(get_agent).delete(unload_agent))
        .route("/agents/:id/stats", get(stats))
        .route("/agents/:id/entry-points", get(entry_points))
        .route("/agents/:id/graphs", get(graphs))
        .route("/agents/:id/trigger", post(trigger))
        .route("/agents/:id/inject", post(inject))
        .route("/agents/:id/chat", post(chat))
        .route("/agents/:id/stop", post(stop))
        .route("/agents/:id/pause", post(pause))
        .route("/agents/:id/resume", post(resume))
        .route("/agents/:id/replay", post(replay))
        .route("/agents/:id/goal-progress", get(goal_progress))
        .route("/agents/:id/logs", get(logs))
        .route("/agents/:id/graphs/:graph/nodes/:node/logs", get(node_logs))
        .route("/agents/:id/events", get(events))
        .with_state(hive.clone());
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{}/api", addr),
        hive,
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn agent_missing(id: &str) -> Response {
    error(StatusCode::NOT_FOUND, format!("agent '{}' not loaded", id))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

async fn discover() -> impl IntoResponse {
    Json(json!({
        "Examples": [
            { "path": DEMO_PATH, "name": "demo", "description": "Demo agent" }
        ]
    }))
}

async fn list_agents(State(hive): State<AppState>) -> impl IntoResponse {
    let data = hive.data.lock().unwrap();
    let agents: Vec<Value> = data.agents.values().cloned().collect();
    Json(json!({ "agents": agents }))
}

#[derive(Deserialize)]
struct LoadBody {
    agent_path: String,
    agent_id: Option<String>,
    model: Option<String>,
}

async fn load_agent(State(hive): State<AppState>, Json(body): Json<LoadBody>) -> Response {
    if !body.agent_path.ends_with(".yaml") {
        return error(
            StatusCode::BAD_REQUEST,
            format!("'{}' is not an agent definition", body.agent_path),
        );
    }
    let id = body.agent_id.unwrap_or_else(|| {
        body.agent_path
            .rsplit('/')
            .next()
            .unwrap_or("agent")
            .trim_end_matches(".yaml")
            .to_string()
    });
    let mut data = hive.data.lock().unwrap();
    if data.agents.contains_key(&id) {
        return error(StatusCode::CONFLICT, format!("agent '{}' already loaded", id));
    }
    let agent = json!({
        "id": id,
        "name": id,
        "agent_path": body.agent_path,
        "model": body.model.unwrap_or_else(|| "default-model".to_string()),
        "node_count": 3,
    });
    data.agents.insert(id, agent.clone());
    Json(agent).into_response()
}

async fn get_agent(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    let data = hive.data.lock().unwrap();
    match data.agents.get(&id) {
        Some(agent) => {
            let mut detail = agent.clone();
            detail["entry_points"] = json!([{ "id": "main", "name": "Main", "entry_node": "plan" }]);
            detail["graphs"] = json!(["main_graph"]);
            Json(detail).into_response()
        }
        None => agent_missing(&id),
    }
}

async fn unload_agent(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    let mut data = hive.data.lock().unwrap();
    if data.agents.remove(&id).is_none() {
        return agent_missing(&id);
    }
    for exec in data.executions.values_mut() {
        if exec.agent_id == id && !exec.state.is_terminal() {
            exec.state = ExecutionState::Stopped;
        }
    }
    Json(json!({ "unloaded": id })).into_response()
}

async fn stats(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    let data = hive.data.lock().unwrap();
    if !data.agents.contains_key(&id) {
        return agent_missing(&id);
    }
    let runs = data.executions.values().filter(|e| e.agent_id == id).count();
    Json(json!({ "executions": runs, "uptime_seconds": 1 })).into_response()
}

async fn entry_points(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    Json(json!({ "entry_points": [{ "id": "main", "name": "Main", "entry_node": "plan" }] }))
        .into_response()
}

async fn graphs(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    Json(json!({ "graphs": ["main_graph"] })).into_response()
}

// ---------------------------------------------------------------------------
// Execution control
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TriggerBody {
    entry_point_id: String,
    input_data: Value,
    session_state: Option<Value>,
}

async fn trigger(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TriggerBody>,
) -> Response {
    let (exec_id, exec) = {
        let mut data = hive.data.lock().unwrap();
        if !data.agents.contains_key(&id) {
            return agent_missing(&id);
        }
        if body.entry_point_id != "main" {
            return error(
                StatusCode::NOT_FOUND,
                format!("entry point '{}' not found", body.entry_point_id),
            );
        }
        data.session_counter += 1;
        let exec_id = format!("exec-{}", uuid::Uuid::new_v4());
        let exec = MockExecution {
            agent_id: id.clone(),
            session_id: format!("session-{}", data.session_counter),
            state: ExecutionState::Created.apply(ExecutionCommand::Start).unwrap(),
        };
        data.checkpoints.insert(exec.session_id.clone(), Vec::new());
        data.executions.insert(exec_id.clone(), exec.clone());
        (exec_id, exec)
    };

    hive.lifecycle_event(
        "execution_started",
        &exec_id,
        &exec,
        json!({ "entry_point_id": body.entry_point_id, "input_data": body.input_data }),
    );
    if let Some(state) = body.session_state {
        hive.lifecycle_event("state_changed", &exec_id, &exec, json!({ "key": "seed", "value": state }));
    }
    hive.lifecycle_event("node_start", &exec_id, &exec, json!({ "node_id": "plan", "graph_id": "main_graph" }));
    hive.lifecycle_event(
        "node_end",
        &exec_id,
        &exec,
        json!({ "node_id": "plan", "graph_id": "main_graph", "success": true }),
    );

    Json(json!({ "execution_id": exec_id, "session_id": exec.session_id })).into_response()
}

#[derive(Deserialize)]
struct InjectBody {
    node_id: String,
    content: String,
    graph_id: Option<String>,
}

async fn inject(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<InjectBody>,
) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    if body.node_id != AWAITING_NODE {
        return error(
            StatusCode::CONFLICT,
            format!("node '{}' is not awaiting input", body.node_id),
        );
    }
    Json(json!({
        "delivered": true,
        "graph_id": body.graph_id.unwrap_or_else(|| "main_graph".into()),
        "length": body.content.len(),
    }))
    .into_response()
}

#[derive(Deserialize)]
struct ChatBody {
    message: String,
}

async fn chat(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    if body.message.is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "message is empty");
    }
    Json(json!({ "status": "started", "execution_id": "chat-exec" })).into_response()
}

#[derive(Deserialize)]
struct ExecutionBody {
    execution_id: String,
}

fn transition(
    hive: &MockHive,
    agent_id: &str,
    execution_id: &str,
    command: ExecutionCommand,
) -> Result<MockExecution, Response> {
    let mut data = hive.data.lock().unwrap();
    if !data.agents.contains_key(agent_id) {
        return Err(agent_missing(agent_id));
    }
    let Some(exec) = data.executions.get_mut(execution_id) else {
        return Err(error(
            StatusCode::NOT_FOUND,
            format!("execution '{}' not found", execution_id),
        ));
    };
    exec.state = exec
        .state
        .apply(command)
        .map_err(|e| error(StatusCode::CONFLICT, e.to_string()))?;
    Ok(exec.clone())
}

async fn stop(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExecutionBody>,
) -> Response {
    match transition(&hive, &id, &body.execution_id, ExecutionCommand::Stop) {
        Ok(exec) => {
            hive.lifecycle_event("execution_stopped", &body.execution_id, &exec, json!({}));
            Json(json!({ "stopped": true, "execution_id": body.execution_id })).into_response()
        }
        Err(response) => response,
    }
}

async fn pause(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExecutionBody>,
) -> Response {
    let exec = match transition(&hive, &id, &body.execution_id, ExecutionCommand::Pause) {
        Ok(exec) => exec,
        Err(response) => return response,
    };
    let checkpoint = {
        let mut data = hive.data.lock().unwrap();
        data.checkpoint_counter += 1;
        let checkpoint = format!("cp-{}", data.checkpoint_counter);
        data.checkpoints
            .entry(exec.session_id.clone())
            .or_default()
            .push(checkpoint.clone());
        checkpoint
    };
    hive.lifecycle_event(
        "execution_paused",
        &body.execution_id,
        &exec,
        json!({ "checkpoint_id": checkpoint }),
    );
    Json(json!({ "stopped": true, "execution_id": body.execution_id, "checkpoint_id": checkpoint }))
        .into_response()
}

#[derive(Deserialize)]
struct ResumeBody {
    session_id: String,
    checkpoint_id: Option<String>,
}

async fn resume(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResumeBody>,
) -> Response {
    let (exec_id, exec, from) = {
        let mut data = hive.data.lock().unwrap();
        if !data.agents.contains_key(&id) {
            return agent_missing(&id);
        }
        let Some(checkpoints) = data.checkpoints.get(&body.session_id).cloned() else {
            return error(
                StatusCode::NOT_FOUND,
                format!("session '{}' not found", body.session_id),
            );
        };
        let Some(latest) = checkpoints.last().cloned() else {
            return error(StatusCode::CONFLICT, "session has no checkpoints");
        };
        let from = match body.checkpoint_id {
            Some(cp) if checkpoints.contains(&cp) => cp,
            Some(cp) => {
                return error(StatusCode::NOT_FOUND, format!("checkpoint '{}' not found", cp))
            }
            None => latest,
        };
        let Some((exec_id, exec)) = data
            .executions
            .iter_mut()
            .find(|(_, e)| e.session_id == body.session_id && e.agent_id == id)
        else {
            return error(StatusCode::NOT_FOUND, "no execution for session");
        };
        exec.state = match exec.state.apply(ExecutionCommand::Resume) {
            Ok(state) => state,
            Err(e) => return error(StatusCode::CONFLICT, e.to_string()),
        };
        (exec_id.clone(), exec.clone(), from)
    };
    hive.lifecycle_event("execution_resumed", &exec_id, &exec, json!({ "checkpoint_id": from }));
    Json(json!({ "execution_id": exec_id, "resumed_from": from })).into_response()
}

#[derive(Deserialize)]
struct ReplayBody {
    session_id: String,
    checkpoint_id: String,
}

async fn replay(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReplayBody>,
) -> Response {
    let (exec_id, exec) = {
        let mut data = hive.data.lock().unwrap();
        if !data.agents.contains_key(&id) {
            return agent_missing(&id);
        }
        let Some(checkpoints) = data.checkpoints.get(&body.session_id) else {
            return error(
                StatusCode::NOT_FOUND,
                format!("session '{}' not found", body.session_id),
            );
        };
        if !checkpoints.contains(&body.checkpoint_id) {
            return error(
                StatusCode::NOT_FOUND,
                format!("checkpoint '{}' not found", body.checkpoint_id),
            );
        }
        let exec_id = format!("exec-{}", uuid::Uuid::new_v4());
        let exec = MockExecution {
            agent_id: id.clone(),
            session_id: body.session_id.clone(),
            state: ExecutionState::Running,
        };
        data.executions.insert(exec_id.clone(), exec.clone());
        (exec_id, exec)
    };
    hive.lifecycle_event("execution_started", &exec_id, &exec, json!({}));
    Json(json!({ "execution_id": exec_id, "replayed_from": body.checkpoint_id })).into_response()
}

async fn goal_progress(State(hive): State<AppState>, Path(id): Path<String>) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    Json(json!({
        "progress": 0.5,
        "criteria": [{ "id": "answered", "met": false }],
        "goal": "answer the question",
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LogsQuery {
    session_id: Option<String>,
    level: Option<String>,
    limit: Option<usize>,
}

fn log_entry(session_id: &str, exec: &MockExecution) -> Value {
    json!({ "session_id": session_id, "status": exec.state.as_str(), "started_at": "2026-01-01T00:00:00Z" })
}

async fn logs(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let data = hive.data.lock().unwrap();
    if !data.agents.contains_key(&id) {
        return agent_missing(&id);
    }
    let Some(session_id) = query.session_id else {
        let mut entries: Vec<Value> = data
            .executions
            .values()
            .filter(|e| e.agent_id == id)
            .map(|e| log_entry(&e.session_id, e))
            .collect();
        if let Some(limit) = query.limit {
            entries.truncate(limit);
        }
        return Json(json!({ "logs": entries })).into_response();
    };
    let Some(exec) = data.executions.values().find(|e| e.session_id == session_id) else {
        return error(StatusCode::NOT_FOUND, format!("session '{}' not found", session_id));
    };
    match query.level.as_deref().unwrap_or("summary") {
        "summary" => Json(log_entry(&session_id, exec)).into_response(),
        "details" => Json(json!({
            "session_id": session_id,
            "nodes": [
                { "node_id": "plan", "node_name": "Plan", "success": true, "tokens": 12 },
                { "node_id": "answer", "node_name": "Answer", "success": true },
            ]
        }))
        .into_response(),
        "tools" => Json(json!({
            "session_id": session_id,
            "steps": [{ "node_id": "plan", "step_index": 0, "tool_name": "search" }]
        }))
        .into_response(),
        other => error(StatusCode::BAD_REQUEST, format!("unknown level '{}'", other)),
    }
}

async fn node_logs(
    State(hive): State<AppState>,
    Path((id, graph, node)): Path<(String, String, String)>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let data = hive.data.lock().unwrap();
    if !data.agents.contains_key(&id) {
        return agent_missing(&id);
    }
    if graph != "main_graph" || node != "plan" {
        return error(StatusCode::NOT_FOUND, format!("node '{}/{}' not found", graph, node));
    }
    let Some(session_id) = query.session_id else {
        return error(StatusCode::BAD_REQUEST, "session_id is required");
    };
    let details = json!([{ "node_id": "plan", "success": true }]);
    let tools = json!([{ "node_id": "plan", "step_index": 0, "tool_name": "search" }]);
    let body = match query.level.as_deref() {
        Some("details") => json!({ "session_id": session_id, "node_id": node, "details": details }),
        Some("tools") => json!({ "session_id": session_id, "node_id": node, "tool_logs": tools }),
        _ => json!({ "session_id": session_id, "node_id": node, "details": details, "tool_logs": tools }),
    };
    Json(body).into_response()
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct EventsQuery {
    types: Option<String>,
}

async fn events(
    State(hive): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    if !hive.data.lock().unwrap().agents.contains_key(&id) {
        return agent_missing(&id);
    }
    let filter = query.types.as_deref().map(EventFilter::parse).unwrap_or_default();
    let mut rx = hive.events.subscribe();

    let stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(Event::default().comment("connected"));
        yield Ok(Event::default().data("not json at all"));
        loop {
            match rx.recv().await {
                Ok((agent_id, event)) => {
                    if agent_id != id {
                        continue;
                    }
                    let kind = event["type"].as_str().map(EventTypeName::from);
                    if !filter.is_empty() && !kind.is_some_and(|k| filter.contains(&k)) {
                        continue;
                    }
                    yield Ok(Event::default().data(event.to_string()));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_millis(200)))
        .into_response()
}
