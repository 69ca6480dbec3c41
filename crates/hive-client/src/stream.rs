//! Persistent event channel: connector seam and its SSE implementation

use crate::transport::{require, ApiClient};
use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use hive_core::{Error, EventFilter, Result};
use std::pin::Pin;
use tracing::debug;

/// Raw `data` payloads of one open channel, in server order.
pub type EventFrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Opens one push channel for an agent. Each successful `connect` is a
/// fresh channel; dropping the returned stream releases it.
#[async_trait]
pub trait EventConnector: Send + Sync {
    async fn connect(&self, agent_id: &str, filter: &EventFilter) -> Result<EventFrameStream>;
}

/// `GET /agents/{id}/events?types=...` as `text/event-stream`.
#[derive(Clone, Debug)]
pub struct HttpEventConnector {
    api: ApiClient,
}

impl HttpEventConnector {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EventConnector for HttpEventConnector {
    async fn connect(&self, agent_id: &str, filter: &EventFilter) -> Result<EventFrameStream> {
        let mut query = Vec::new();
        if let Some(types) = filter.query_value() {
            query.push(("types", types));
        }
        let response = self
            .api
            .open_stream(&["agents", require("agent_id", agent_id)?, "events"], &query)
            .await?;
        debug!("Event stream open for agent {}", agent_id);
        Ok(parse_sse_frames(response.bytes_stream()))
    }
}

/// Decode an SSE byte stream into `data` payloads. Comment lines
/// (keepalives) and events without data never surface.
pub fn parse_sse_frames<S, E>(byte_stream: S) -> EventFrameStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let frames = byte_stream
        .map(|result| result.map_err(|e| std::io::Error::other(e.to_string())))
        .eventsource()
        .filter_map(|result| {
            futures::future::ready(match result {
                Ok(event) if event.data.is_empty() => None,
                Ok(event) => Some(Ok(event.data)),
                Err(e) => Some(Err(Error::transport(e.to_string()))),
            })
        });
    Box::pin(frames)
}
