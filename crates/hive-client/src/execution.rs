//! Execution control: trigger, inject, chat, stop, pause, resume, replay
//!
//! Every call is an independent request. Nothing is queued or coalesced:
//! two overlapping `trigger` calls start two executions. There is no local
//! cancellation of an in-flight call; use `stop`/`pause` to affect the
//! server.

use crate::transport::{require, ApiClient};
use hive_core::{
    ChatRequest, ChatResult, ExecutionRequest, GoalProgress, InjectRequest, InjectResult,
    ReplayRequest, ReplayResult, Result, ResumeRequest, ResumeResult, StopResult, TriggerRequest,
    TriggerResult,
};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct ExecutionApi {
    api: ApiClient,
}

impl ExecutionApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Start a new execution at `entry_point_id`. The only call that creates one.
    ///
    /// `session_state` seeds session memory and is forwarded as-is.
    pub async fn trigger(
        &self,
        agent_id: &str,
        entry_point_id: &str,
        input_data: serde_json::Value,
        session_state: Option<serde_json::Value>,
    ) -> Result<TriggerResult> {
        let request = TriggerRequest {
            entry_point_id: require("entry_point_id", entry_point_id)?.to_string(),
            input_data,
            session_state,
        };
        let result: TriggerResult = self
            .api
            .post(&["agents", require("agent_id", agent_id)?, "trigger"], &request)
            .await?;
        info!(
            "Triggered {} on agent {}: execution {}",
            entry_point_id, agent_id, result.execution_id
        );
        Ok(result)
    }

    /// Deliver human-in-the-loop content to a node awaiting input.
    pub async fn inject(
        &self,
        agent_id: &str,
        node_id: &str,
        content: &str,
        graph_id: Option<&str>,
    ) -> Result<InjectResult> {
        let request = InjectRequest {
            node_id: require("node_id", node_id)?.to_string(),
            content: content.to_string(),
            graph_id: graph_id.map(String::from),
        };
        debug!("Injecting into {}/{}", agent_id, node_id);
        self.api
            .post(&["agents", require("agent_id", agent_id)?, "inject"], &request)
            .await
    }

    pub async fn chat(&self, agent_id: &str, message: &str) -> Result<ChatResult> {
        let request = ChatRequest {
            message: message.to_string(),
        };
        self.api
            .post(&["agents", require("agent_id", agent_id)?, "chat"], &request)
            .await
    }

    /// Hard-terminate an execution. It cannot be resumed afterwards.
    pub async fn stop(&self, agent_id: &str, execution_id: &str) -> Result<StopResult> {
        self.execution_command(agent_id, "stop", execution_id).await
    }

    /// Suspend an execution so it can later be resumed from a checkpoint.
    pub async fn pause(&self, agent_id: &str, execution_id: &str) -> Result<StopResult> {
        self.execution_command(agent_id, "pause", execution_id).await
    }

    /// Continue a session from `checkpoint_id`, or from its latest checkpoint when `None`.
    pub async fn resume(
        &self,
        agent_id: &str,
        session_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<ResumeResult> {
        if let Some(checkpoint) = checkpoint_id {
            require("checkpoint_id", checkpoint)?;
        }
        let request = ResumeRequest {
            session_id: require("session_id", session_id)?.to_string(),
            checkpoint_id: checkpoint_id.map(String::from),
        };
        let result: ResumeResult = self
            .api
            .post(&["agents", require("agent_id", agent_id)?, "resume"], &request)
            .await?;
        info!("Resumed session {}: execution {}", session_id, result.execution_id);
        Ok(result)
    }

    /// Re-run a session from a named checkpoint as a new execution.
    ///
    /// Not idempotent: each call produces a distinct execution, and the
    /// original is left untouched.
    pub async fn replay(
        &self,
        agent_id: &str,
        session_id: &str,
        checkpoint_id: &str,
    ) -> Result<ReplayResult> {
        let request = ReplayRequest {
            session_id: require("session_id", session_id)?.to_string(),
            checkpoint_id: require("checkpoint_id", checkpoint_id)?.to_string(),
        };
        let result: ReplayResult = self
            .api
            .post(&["agents", require("agent_id", agent_id)?, "replay"], &request)
            .await?;
        info!(
            "Replayed session {} from {}: execution {}",
            session_id, checkpoint_id, result.execution_id
        );
        Ok(result)
    }

    pub async fn goal_progress(&self, agent_id: &str) -> Result<GoalProgress> {
        self.api
            .get(&["agents", require("agent_id", agent_id)?, "goal-progress"])
            .await
    }

    async fn execution_command(
        &self,
        agent_id: &str,
        command: &str,
        execution_id: &str,
    ) -> Result<StopResult> {
        let request = ExecutionRequest {
            execution_id: require("execution_id", execution_id)?.to_string(),
        };
        let result = self
            .api
            .post(&["agents", require("agent_id", agent_id)?, command], &request)
            .await?;
        info!("{} requested for execution {}", command, execution_id);
        Ok(result)
    }
}
