//! Request and response types for the Hive control plane

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form JSON object, passed through untouched.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A loaded agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_path: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// `GET /agents/{id}`: the agent plus its graph surface.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub agent: Agent,
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
    #[serde(default)]
    pub graphs: Vec<String>,
}

/// An agent definition found on disk but not necessarily loaded.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredAgent {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// `GET /discover`: discoverable agents grouped by category.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DiscoverResult {
    pub categories: BTreeMap<String, Vec<DiscoveredAgent>>,
}

impl DiscoverResult {
    pub fn agents(&self) -> impl Iterator<Item = &DiscoveredAgent> {
        self.categories.values().flatten()
    }
}

/// A named invocation target on an agent's graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryPoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoadAgentRequest {
    pub agent_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentList {
    pub agents: Vec<Agent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnloadResult {
    pub unloaded: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryPointList {
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphList {
    pub graphs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Execution control
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct TriggerRequest {
    pub entry_point_id: String,
    pub input_data: serde_json::Value,
    /// Seeds session memory. Never inspected by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct InjectRequest {
    pub node_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body for `stop` and `pause`.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionRequest {
    pub execution_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResumeRequest {
    pub session_id: String,
    /// `None` resumes from the latest checkpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplayRequest {
    pub session_id: String,
    pub checkpoint_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TriggerResult {
    pub execution_id: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InjectResult {
    #[serde(default)]
    pub delivered: bool,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response to `stop` and `pause`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StopResult {
    #[serde(default)]
    pub stopped: bool,
    #[serde(default)]
    pub execution_id: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResumeResult {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReplayResult {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replayed_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Point-in-time progress projection. Eventually consistent with the event stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GoalProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub criteria: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Granularity of a session log query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Summary,
    Details,
    Tools,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Summary => "summary",
            LogLevel::Details => "details",
            LogLevel::Tools => "tools",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(LogLevel::Summary),
            "details" => Ok(LogLevel::Details),
            "tools" => Ok(LogLevel::Tools),
            other => Err(crate::Error::validation(format!(
                "unknown log level '{}' (expected summary, details or tools)",
                other
            ))),
        }
    }
}

/// One session's summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Per-node detail inside a session.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LogNodeDetail {
    #[serde(default)]
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Per-tool-call step inside a node.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LogToolStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogList {
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDetails {
    pub session_id: String,
    #[serde(default)]
    pub nodes: Vec<LogNodeDetail>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionToolSteps {
    pub session_id: String,
    #[serde(default)]
    pub steps: Vec<LogToolStep>,
}

/// Logs narrowed to a single graph/node pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeLogs {
    pub session_id: String,
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<LogNodeDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_logs: Option<Vec<LogToolStep>>,
}
