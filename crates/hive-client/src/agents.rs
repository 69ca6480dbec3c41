//! Agent registry: discover, load, inspect and unload agent definitions

use crate::transport::{require, ApiClient};
use hive_core::{
    Agent, AgentDetail, AgentList, DiscoverResult, EntryPoint, EntryPointList, GraphList, JsonMap,
    LoadAgentRequest, Result, UnloadResult,
};
use tracing::info;

#[derive(Clone, Debug)]
pub struct AgentsApi {
    api: ApiClient,
}

impl AgentsApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Agent definitions available to load. No side effects.
    pub async fn discover(&self) -> Result<DiscoverResult> {
        self.api.get(&["discover"]).await
    }

    /// Agents currently loaded on the server.
    pub async fn list(&self) -> Result<Vec<Agent>> {
        let list: AgentList = self.api.get(&["agents"]).await?;
        Ok(list.agents)
    }

    /// Load the agent at `agent_path`. `agent_id` is a hint the server may
    /// reject or replace; `model` overrides the agent's default model.
    pub async fn load(
        &self,
        agent_path: &str,
        agent_id: Option<&str>,
        model: Option<&str>,
    ) -> Result<Agent> {
        let request = LoadAgentRequest {
            agent_path: require("agent_path", agent_path)?.to_string(),
            agent_id: agent_id.map(String::from),
            model: model.map(String::from),
        };
        let agent: Agent = self.api.post(&["agents"], &request).await?;
        info!("Loaded agent {} from {}", agent.id, agent_path);
        Ok(agent)
    }

    pub async fn get(&self, agent_id: &str) -> Result<AgentDetail> {
        self.api.get(&["agents", require("agent_id", agent_id)?]).await
    }

    /// Unload an agent. Returns the id the server unloaded; a second unload
    /// of the same id fails with `NotFound`.
    pub async fn unload(&self, agent_id: &str) -> Result<String> {
        let result: UnloadResult = self
            .api
            .delete(&["agents", require("agent_id", agent_id)?])
            .await?;
        info!("Unloaded agent {}", result.unloaded);
        Ok(result.unloaded)
    }

    pub async fn stats(&self, agent_id: &str) -> Result<JsonMap> {
        self.api
            .get(&["agents", require("agent_id", agent_id)?, "stats"])
            .await
    }

    pub async fn entry_points(&self, agent_id: &str) -> Result<Vec<EntryPoint>> {
        let list: EntryPointList = self
            .api
            .get(&["agents", require("agent_id", agent_id)?, "entry-points"])
            .await?;
        Ok(list.entry_points)
    }

    pub async fn graphs(&self, agent_id: &str) -> Result<Vec<String>> {
        let list: GraphList = self
            .api
            .get(&["agents", require("agent_id", agent_id)?, "graphs"])
            .await?;
        Ok(list.graphs)
    }
}
