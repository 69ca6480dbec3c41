//! Execution lifecycle
//!
//! ```text
//! created ─start─▶ running ─pause─▶ paused ─resume─▶ running
//!                     │               │
//!                     ├─complete─▶ completed
//!                     ├─fail─────▶ failed
//!                     └─stop─────▶ stopped ◀─stop─┘
//! ```
//!
//! Replay targets a session checkpoint and spawns a sibling execution; it
//! never moves the execution it was derived from.

use crate::error::{Error, Result};
use crate::events::{AgentEvent, EventTypeName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Created,
    Running,
    Paused,
    Completed,
    Stopped,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionCommand {
    Start,
    Pause,
    Resume,
    Replay,
    Stop,
    Complete,
    Fail,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Stopped | ExecutionState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Created => "created",
            ExecutionState::Running => "running",
            ExecutionState::Paused => "paused",
            ExecutionState::Completed => "completed",
            ExecutionState::Stopped => "stopped",
            ExecutionState::Failed => "failed",
        }
    }

    /// Next state after `command`, or `InvalidState` if the transition is illegal.
    pub fn apply(self, command: ExecutionCommand) -> Result<ExecutionState> {
        use ExecutionCommand as C;
        use ExecutionState as S;

        match (self, command) {
            (state, C::Replay) => Ok(state),
            (S::Created, C::Start) => Ok(S::Running),
            (S::Running, C::Pause) => Ok(S::Paused),
            (S::Running, C::Complete) => Ok(S::Completed),
            (S::Running, C::Fail) => Ok(S::Failed),
            (S::Running | S::Paused, C::Stop) => Ok(S::Stopped),
            (S::Paused, C::Resume) => Ok(S::Running),
            (state, command) => Err(Error::invalid_state(format!(
                "cannot {:?} an execution that is {}",
                command,
                state.as_str()
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State an execution is in after the server reports `event`, if it is a lifecycle event.
pub fn state_after(event: &AgentEvent) -> Option<ExecutionState> {
    // By tag, so events whose fields did not decode still count.
    match event.event_type() {
        EventTypeName::ExecutionStarted | EventTypeName::ExecutionResumed => {
            Some(ExecutionState::Running)
        }
        EventTypeName::ExecutionPaused => Some(ExecutionState::Paused),
        EventTypeName::ExecutionCompleted => Some(ExecutionState::Completed),
        EventTypeName::ExecutionFailed => Some(ExecutionState::Failed),
        EventTypeName::ExecutionStopped => Some(ExecutionState::Stopped),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedExecution {
    pub state: ExecutionState,
    pub session_id: Option<String>,
}

/// In-memory projection of execution states folded from the event stream.
///
/// The server stays the source of truth: observed events overwrite local
/// state even when the jump is not a legal single transition (events may
/// have been missed across a reconnect).
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    executions: HashMap<String, TrackedExecution>,
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an execution the caller just created (trigger or replay).
    pub fn record_created(&mut self, execution_id: impl Into<String>, session_id: Option<String>) {
        self.executions.insert(
            execution_id.into(),
            TrackedExecution {
                state: ExecutionState::Created,
                session_id,
            },
        );
    }

    /// Fold one event in. Returns the new state when the event moved an execution.
    pub fn observe(&mut self, event: &AgentEvent) -> Option<ExecutionState> {
        let execution_id = event.execution_id.as_ref()?;
        let next = state_after(event)?;
        let entry = self
            .executions
            .entry(execution_id.clone())
            .or_insert_with(|| TrackedExecution {
                state: ExecutionState::Created,
                session_id: None,
            });
        if entry.session_id.is_none() {
            entry.session_id = event.session_id.clone();
        }
        entry.state = next;
        Some(next)
    }

    pub fn state(&self, execution_id: &str) -> Option<ExecutionState> {
        self.executions.get(execution_id).map(|e| e.state)
    }

    pub fn get(&self, execution_id: &str) -> Option<&TrackedExecution> {
        self.executions.get(execution_id)
    }

    /// Pre-check a command against the tracked state. Untracked executions pass.
    pub fn check(&self, execution_id: &str, command: ExecutionCommand) -> Result<()> {
        match self.executions.get(execution_id) {
            Some(tracked) => tracked.state.apply(command).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Executions belonging to `session_id`.
    pub fn session_executions<'a>(
        &'a self,
        session_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a TrackedExecution)> + 'a {
        self.executions
            .iter()
            .filter(move |(_, t)| t.session_id.as_deref() == Some(session_id))
            .map(|(id, t)| (id.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
