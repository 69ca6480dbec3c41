//! Session log introspection at three levels of detail
//!
//! One endpoint, level chosen by the `level` query parameter:
//! `summary` → [`LogEntry`], `details` → per-node entries,
//! `tools` → per-tool-call steps.

use crate::transport::{require, ApiClient};
use hive_core::{
    Error, LogEntry, LogLevel, LogList, NodeLogs, Result, SessionDetails, SessionToolSteps,
};

#[derive(Clone, Debug)]
pub struct LogsApi {
    api: ApiClient,
}

impl LogsApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Most recent entries across sessions. Unbounded when `limit` is `None`.
    pub async fn list(&self, agent_id: &str, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            if limit == 0 {
                return Err(Error::validation("limit must be at least 1"));
            }
            query.push(("limit", limit.to_string()));
        }
        let list: LogList = self
            .api
            .get_with_query(&["agents", require("agent_id", agent_id)?, "logs"], &query)
            .await?;
        Ok(list.logs)
    }

    pub async fn summary(&self, agent_id: &str, session_id: &str) -> Result<LogEntry> {
        self.session_query(agent_id, session_id, LogLevel::Summary).await
    }

    pub async fn details(&self, agent_id: &str, session_id: &str) -> Result<SessionDetails> {
        self.session_query(agent_id, session_id, LogLevel::Details).await
    }

    pub async fn tools(&self, agent_id: &str, session_id: &str) -> Result<SessionToolSteps> {
        self.session_query(agent_id, session_id, LogLevel::Tools).await
    }

    /// Logs for one graph/node pair. `None` leaves the granularity to the server.
    pub async fn node_logs(
        &self,
        agent_id: &str,
        graph_id: &str,
        node_id: &str,
        session_id: &str,
        level: Option<LogLevel>,
    ) -> Result<NodeLogs> {
        let mut query = vec![("session_id", require("session_id", session_id)?.to_string())];
        if let Some(level) = level {
            query.push(("level", level.as_str().to_string()));
        }
        self.api
            .get_with_query(
                &[
                    "agents",
                    require("agent_id", agent_id)?,
                    "graphs",
                    require("graph_id", graph_id)?,
                    "nodes",
                    require("node_id", node_id)?,
                    "logs",
                ],
                &query,
            )
            .await
    }

    async fn session_query<T: serde::de::DeserializeOwned>(
        &self,
        agent_id: &str,
        session_id: &str,
        level: LogLevel,
    ) -> Result<T> {
        let query = [
            ("session_id", require("session_id", session_id)?.to_string()),
            ("level", level.as_str().to_string()),
        ];
        self.api
            .get_with_query(&["agents", require("agent_id", agent_id)?, "logs"], &query)
            .await
    }
}
