//! Hive Client - control and observation of a remote multi-agent engine
//!
//! [`HiveClient`] bundles the four clients that share one HTTP transport:
//! agent registry, execution control, log introspection, and the live
//! event stream.

pub mod agents;
pub mod config;
pub mod execution;
pub mod logs;
pub mod stream;
pub mod subscription;
pub mod transport;

pub use agents::AgentsApi;
pub use config::{ApiConfig, ClientConfig, EventsConfig};
pub use execution::ExecutionApi;
pub use hive_core::*;
pub use logs::LogsApi;
pub use stream::{EventConnector, EventFrameStream, HttpEventConnector};
pub use subscription::{channel_callback, EventCallback, EventSubscription, SubscriptionOptions};
pub use transport::ApiClient;

use std::sync::Arc;

/// Entry point bundling every API over one transport.
#[derive(Clone)]
pub struct HiveClient {
    api: ApiClient,
    config: ClientConfig,
}

impl HiveClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::from_config(&config)?;
        Ok(Self { api, config })
    }

    pub fn agents(&self) -> AgentsApi {
        AgentsApi::new(self.api.clone())
    }

    pub fn execution(&self) -> ExecutionApi {
        ExecutionApi::new(self.api.clone())
    }

    pub fn logs(&self) -> LogsApi {
        LogsApi::new(self.api.clone())
    }

    pub fn event_connector(&self) -> Arc<HttpEventConnector> {
        Arc::new(HttpEventConnector::new(self.api.clone()))
    }

    /// A new, not yet activated, event subscription bound to this server.
    pub fn subscribe(&self, callback: EventCallback) -> EventSubscription {
        EventSubscription::new(self.event_connector(), callback)
            .with_reconnect_delay(self.config.events.reconnect_delay())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
