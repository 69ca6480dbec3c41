//! Agent events pushed over the live event stream
//!
//! Wire format (one JSON object per SSE `data:` payload):
//!
//!   { "type": "node_start", "execution_id": "exec-1", "node_id": "plan", ... }
//!
//! The envelope (`type`, `execution_id`, `session_id`, `timestamp`) is lifted
//! into [`AgentEvent`]; the remaining fields become a typed [`EventPayload`].
//! Unrecognized `type` tags, and known tags whose fields do not fit the typed
//! payload, are kept verbatim as [`EventPayload::Other`].

use crate::error::{Error, Result};
use crate::types::JsonMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Event type names
// ---------------------------------------------------------------------------

/// Event kinds the server and client agree on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventTypeName {
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    ExecutionPaused,
    ExecutionResumed,
    ExecutionStopped,
    NodeStart,
    NodeEnd,
    NodeLoopIteration,
    LlmTextDelta,
    ToolCallStart,
    ToolCallEnd,
    ClientInputRequested,
    CheckpointCreated,
    StateChanged,
    GoalProgress,
    Custom,
    /// A tag this client does not know yet.
    Other(String),
}

impl EventTypeName {
    pub const KNOWN: [EventTypeName; 17] = [
        EventTypeName::ExecutionStarted,
        EventTypeName::ExecutionCompleted,
        EventTypeName::ExecutionFailed,
        EventTypeName::ExecutionPaused,
        EventTypeName::ExecutionResumed,
        EventTypeName::ExecutionStopped,
        EventTypeName::NodeStart,
        EventTypeName::NodeEnd,
        EventTypeName::NodeLoopIteration,
        EventTypeName::LlmTextDelta,
        EventTypeName::ToolCallStart,
        EventTypeName::ToolCallEnd,
        EventTypeName::ClientInputRequested,
        EventTypeName::CheckpointCreated,
        EventTypeName::StateChanged,
        EventTypeName::GoalProgress,
        EventTypeName::Custom,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventTypeName::ExecutionStarted => "execution_started",
            EventTypeName::ExecutionCompleted => "execution_completed",
            EventTypeName::ExecutionFailed => "execution_failed",
            EventTypeName::ExecutionPaused => "execution_paused",
            EventTypeName::ExecutionResumed => "execution_resumed",
            EventTypeName::ExecutionStopped => "execution_stopped",
            EventTypeName::NodeStart => "node_start",
            EventTypeName::NodeEnd => "node_end",
            EventTypeName::NodeLoopIteration => "node_loop_iteration",
            EventTypeName::LlmTextDelta => "llm_text_delta",
            EventTypeName::ToolCallStart => "tool_call_start",
            EventTypeName::ToolCallEnd => "tool_call_end",
            EventTypeName::ClientInputRequested => "client_input_requested",
            EventTypeName::CheckpointCreated => "checkpoint_created",
            EventTypeName::StateChanged => "state_changed",
            EventTypeName::GoalProgress => "goal_progress",
            EventTypeName::Custom => "custom",
            EventTypeName::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventTypeName::Other(_))
    }
}

impl From<&str> for EventTypeName {
    fn from(s: &str) -> Self {
        EventTypeName::KNOWN
            .iter()
            .find(|known| known.as_str() == s)
            .cloned()
            .unwrap_or_else(|| EventTypeName::Other(s.to_string()))
    }
}

impl From<String> for EventTypeName {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl std::fmt::Display for EventTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventTypeName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventTypeName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventTypeName::from(s))
    }
}

// ---------------------------------------------------------------------------
// Event filter
// ---------------------------------------------------------------------------

/// The set of event types a subscription asks the server for.
///
/// Equality is set equality: order and duplicates do not matter. An empty
/// filter means "everything".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventFilter(BTreeSet<EventTypeName>);

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EventTypeName>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &EventTypeName) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventTypeName> {
        self.0.iter()
    }

    /// Value of the `types` query parameter, or `None` when unfiltered.
    pub fn query_value(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(EventTypeName::as_str)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl<T: Into<EventTypeName>> FromIterator<T> for EventFilter {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionStartedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionCompletedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionFailedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Shared by pause, resume and stop notifications.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionTransitionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextDeltaData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolCallData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputRequestedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckpointData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateChangedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoalProgressData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Type-specific part of an [`AgentEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    ExecutionStarted(ExecutionStartedData),
    ExecutionCompleted(ExecutionCompletedData),
    ExecutionFailed(ExecutionFailedData),
    ExecutionPaused(ExecutionTransitionData),
    ExecutionResumed(ExecutionTransitionData),
    ExecutionStopped(ExecutionTransitionData),
    NodeStart(NodeData),
    NodeEnd(NodeData),
    NodeLoopIteration(NodeData),
    LlmTextDelta(TextDeltaData),
    ToolCallStart(ToolCallData),
    ToolCallEnd(ToolCallData),
    ClientInputRequested(InputRequestedData),
    CheckpointCreated(CheckpointData),
    StateChanged(StateChangedData),
    GoalProgress(GoalProgressData),
    Custom(JsonMap),
    /// Fields kept as received: the tag is unrecognized, or the fields did
    /// not decode into the typed payload for a known tag.
    Other { event_type: String, data: JsonMap },
}

fn from_map<T: DeserializeOwned>(map: JsonMap) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| Error::parse(e.to_string()))
}

fn to_map<T: Serialize>(data: &T) -> JsonMap {
    match serde_json::to_value(data) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => JsonMap::new(),
    }
}

impl EventPayload {
    /// Any tagged object becomes a payload. Typed decoding is best effort.
    fn from_parts(kind: EventTypeName, data: JsonMap) -> Self {
        match Self::typed(&kind, data.clone()) {
            Ok(payload) => payload,
            Err(_) => EventPayload::Other {
                event_type: kind.as_str().to_string(),
                data,
            },
        }
    }

    fn typed(kind: &EventTypeName, data: JsonMap) -> Result<Self> {
        Ok(match kind {
            EventTypeName::ExecutionStarted => EventPayload::ExecutionStarted(from_map(data)?),
            EventTypeName::ExecutionCompleted => EventPayload::ExecutionCompleted(from_map(data)?),
            EventTypeName::ExecutionFailed => EventPayload::ExecutionFailed(from_map(data)?),
            EventTypeName::ExecutionPaused => EventPayload::ExecutionPaused(from_map(data)?),
            EventTypeName::ExecutionResumed => EventPayload::ExecutionResumed(from_map(data)?),
            EventTypeName::ExecutionStopped => EventPayload::ExecutionStopped(from_map(data)?),
            EventTypeName::NodeStart => EventPayload::NodeStart(from_map(data)?),
            EventTypeName::NodeEnd => EventPayload::NodeEnd(from_map(data)?),
            EventTypeName::NodeLoopIteration => EventPayload::NodeLoopIteration(from_map(data)?),
            EventTypeName::LlmTextDelta => EventPayload::LlmTextDelta(from_map(data)?),
            EventTypeName::ToolCallStart => EventPayload::ToolCallStart(from_map(data)?),
            EventTypeName::ToolCallEnd => EventPayload::ToolCallEnd(from_map(data)?),
            EventTypeName::ClientInputRequested => {
                EventPayload::ClientInputRequested(from_map(data)?)
            }
            EventTypeName::CheckpointCreated => EventPayload::CheckpointCreated(from_map(data)?),
            EventTypeName::StateChanged => EventPayload::StateChanged(from_map(data)?),
            EventTypeName::GoalProgress => EventPayload::GoalProgress(from_map(data)?),
            EventTypeName::Custom => EventPayload::Custom(data),
            EventTypeName::Other(event_type) => EventPayload::Other {
                event_type: event_type.clone(),
                data,
            },
        })
    }

    pub fn event_type(&self) -> EventTypeName {
        match self {
            EventPayload::ExecutionStarted(_) => EventTypeName::ExecutionStarted,
            EventPayload::ExecutionCompleted(_) => EventTypeName::ExecutionCompleted,
            EventPayload::ExecutionFailed(_) => EventTypeName::ExecutionFailed,
            EventPayload::ExecutionPaused(_) => EventTypeName::ExecutionPaused,
            EventPayload::ExecutionResumed(_) => EventTypeName::ExecutionResumed,
            EventPayload::ExecutionStopped(_) => EventTypeName::ExecutionStopped,
            EventPayload::NodeStart(_) => EventTypeName::NodeStart,
            EventPayload::NodeEnd(_) => EventTypeName::NodeEnd,
            EventPayload::NodeLoopIteration(_) => EventTypeName::NodeLoopIteration,
            EventPayload::LlmTextDelta(_) => EventTypeName::LlmTextDelta,
            EventPayload::ToolCallStart(_) => EventTypeName::ToolCallStart,
            EventPayload::ToolCallEnd(_) => EventTypeName::ToolCallEnd,
            EventPayload::ClientInputRequested(_) => EventTypeName::ClientInputRequested,
            EventPayload::CheckpointCreated(_) => EventTypeName::CheckpointCreated,
            EventPayload::StateChanged(_) => EventTypeName::StateChanged,
            EventPayload::GoalProgress(_) => EventTypeName::GoalProgress,
            EventPayload::Custom(_) => EventTypeName::Custom,
            EventPayload::Other { event_type, .. } => EventTypeName::from(event_type.as_str()),
        }
    }

    fn to_map(&self) -> JsonMap {
        match self {
            EventPayload::ExecutionStarted(d) => to_map(d),
            EventPayload::ExecutionCompleted(d) => to_map(d),
            EventPayload::ExecutionFailed(d) => to_map(d),
            EventPayload::ExecutionPaused(d)
            | EventPayload::ExecutionResumed(d)
            | EventPayload::ExecutionStopped(d) => to_map(d),
            EventPayload::NodeStart(d) | EventPayload::NodeEnd(d) | EventPayload::NodeLoopIteration(d) => {
                to_map(d)
            }
            EventPayload::LlmTextDelta(d) => to_map(d),
            EventPayload::ToolCallStart(d) | EventPayload::ToolCallEnd(d) => to_map(d),
            EventPayload::ClientInputRequested(d) => to_map(d),
            EventPayload::CheckpointCreated(d) => to_map(d),
            EventPayload::StateChanged(d) => to_map(d),
            EventPayload::GoalProgress(d) => to_map(d),
            EventPayload::Custom(data) | EventPayload::Other { data, .. } => data.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentEvent
// ---------------------------------------------------------------------------

/// One notification from the live event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct AgentEvent {
    pub execution_id: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub payload: EventPayload,
}

fn take_string(map: &mut JsonMap, key: &str) -> Option<String> {
    match map.get(key) {
        Some(serde_json::Value::String(_)) => match map.remove(key) {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

impl AgentEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            execution_id: None,
            session_id: None,
            timestamp: None,
            payload,
        }
    }

    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Parse one stream frame. Anything that is not a JSON object with a
    /// string `type` is a [`Error::Parse`].
    pub fn parse(frame: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(frame).map_err(|e| Error::parse(e.to_string()))?;
        Self::try_from(value)
    }

    pub fn event_type(&self) -> EventTypeName {
        self.payload.event_type()
    }

    /// Node this event refers to, when the payload carries one.
    pub fn node_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::NodeStart(d) | EventPayload::NodeEnd(d) | EventPayload::NodeLoopIteration(d) => {
                d.node_id.as_deref()
            }
            EventPayload::LlmTextDelta(d) => d.node_id.as_deref(),
            EventPayload::ToolCallStart(d) | EventPayload::ToolCallEnd(d) => d.node_id.as_deref(),
            EventPayload::ClientInputRequested(d) => d.node_id.as_deref(),
            EventPayload::CheckpointCreated(d) => d.node_id.as_deref(),
            EventPayload::Other { data, .. } => data.get("node_id").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

impl TryFrom<serde_json::Value> for AgentEvent {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(Error::parse("event is not a JSON object"));
        };
        let tag = match map.remove("type") {
            Some(serde_json::Value::String(tag)) => tag,
            Some(_) => return Err(Error::parse("event type is not a string")),
            None => return Err(Error::parse("event has no type")),
        };
        let execution_id = take_string(&mut map, "execution_id");
        let session_id = take_string(&mut map, "session_id");
        let timestamp = take_string(&mut map, "timestamp");
        let payload = EventPayload::from_parts(EventTypeName::from(tag), map);
        Ok(Self {
            execution_id,
            session_id,
            timestamp,
            payload,
        })
    }
}

impl From<AgentEvent> for serde_json::Value {
    fn from(event: AgentEvent) -> Self {
        let mut map = event.payload.to_map();
        map.insert(
            "type".to_string(),
            serde_json::Value::String(event.payload.event_type().as_str().to_string()),
        );
        if let Some(id) = event.execution_id {
            map.insert("execution_id".to_string(), serde_json::Value::String(id));
        }
        if let Some(id) = event.session_id {
            map.insert("session_id".to_string(), serde_json::Value::String(id));
        }
        if let Some(ts) = event.timestamp {
            map.insert("timestamp".to_string(), serde_json::Value::String(ts));
        }
        serde_json::Value::Object(map)
    }
}
