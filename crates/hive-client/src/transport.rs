//! HTTP transport shared by every Hive API

use crate::config::ClientConfig;
use hive_core::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// JSON request/response wrapper around one base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(&ClientConfig {
            api: crate::config::ApiConfig {
                base_url: base_url.to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.api.base_url)
            .map_err(|e| Error::Config(format!("invalid base url '{}': {}", config.api.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base url '{}' cannot carry a path",
                config.api.base_url
            )));
        }
        // Url::join semantics are not wanted; segments are appended explicitly.
        let trimmed = base_url.path().trim_end_matches('/').to_string();
        base_url.set_path(&trimmed);

        let mut builder = Client::builder();
        if let Some(timeout) = config.events.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout: config.api.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments against the base URL. Each segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        for segment in segments {
            if segment.is_empty() {
                return Err(Error::validation("empty path segment"));
            }
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.get_with_query(segments, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {} {:?}", url, query);
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!("DELETE {}", url);
        self.send(self.client.delete(url)).await
    }

    /// Open a long-lived GET without the per-request timeout.
    pub(crate) async fn open_stream(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        debug!("GET (stream) {} {:?}", url, query);
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await.map_err(transport_error)?;
        check_status(response).await
    }

    async fn send<T: DeserializeOwned>(&self, mut request: RequestBuilder) -> Result<T> {
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| Error::parse(format!("response body: {}", e)))
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> Error {
    Error::Transport {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    warn!("Hive API error {}: {}", status, message);
    Err(Error::from_status(status.as_u16(), message))
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(other) if !other.is_null() => return Some(other.to_string()),
                _ => {}
            }
        }
    }
    Some(trimmed.to_string())
}

/// Reject empty identifiers before any request goes out.
pub(crate) fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}
