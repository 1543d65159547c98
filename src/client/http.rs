//! Langfuse HTTP client
//!
//! Buffers ingestion events in memory and sends them in batches to
//! `POST {host}/api/public/ingestion`. A batch is sent when the buffer
//! reaches `max_batch_size`, on `flush()`, or periodically when a flush
//! loop is running. Transport failures are logged, never returned.

use super::model::{Event, Generation, Span, Trace};
use super::LangfuseClient;
use crate::config::DEFAULT_HOST;
use crate::error::{ObservabilityError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const INGESTION_PATH: &str = "/api/public/ingestion";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Langfuse API endpoint
    pub host: String,
    pub public_key: String,
    pub secret_key: String,
    /// Buffered events that trigger an immediate send
    pub max_batch_size: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            public_key: String::new(),
            secret_key: String::new(),
            max_batch_size: 100,
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpClientConfig {
    /// Read `LANGFUSE_HOST`, `LANGFUSE_PUBLIC_KEY` and `LANGFUSE_SECRET_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with a caller-supplied variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let public_key = lookup("LANGFUSE_PUBLIC_KEY").unwrap_or_default();
        let secret_key = lookup("LANGFUSE_SECRET_KEY").unwrap_or_default();
        if public_key.is_empty() || secret_key.is_empty() {
            return Err(ObservabilityError::Config(
                "LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY must be set".to_string(),
            ));
        }

        let host = lookup("LANGFUSE_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(Self {
            host,
            public_key,
            secret_key,
            ..Default::default()
        })
    }

    fn ingestion_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), INGESTION_PATH)
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.public_key, self.secret_key);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

/// One entry of an ingestion batch
#[derive(Debug, Clone, Serialize)]
struct IngestionEvent {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: &'static str,
    body: Value,
}

#[derive(Debug, Serialize)]
struct IngestionBatch<'a> {
    batch: &'a [IngestionEvent],
}

/// Partial-failure report returned with HTTP 207
#[derive(Debug, Default, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    errors: Vec<IngestionError>,
}

#[derive(Debug, Deserialize)]
struct IngestionError {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: Option<String>,
}

/// Batching `LangfuseClient` over the Langfuse ingestion API
pub struct HttpClient {
    http: reqwest::Client,
    url: String,
    auth: String,
    max_batch_size: usize,
    buffer: Mutex<Vec<IngestionEvent>>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        if config.public_key.is_empty() || config.secret_key.is_empty() {
            return Err(ObservabilityError::Config(
                "public_key and secret_key are required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            url: config.ingestion_url(),
            auth: config.auth_header(),
            max_batch_size: config.max_batch_size.max(1),
            buffer: Mutex::new(Vec::new()),
        })
    }

    /// Build from `LANGFUSE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(HttpClientConfig::from_env()?)
    }

    /// Number of buffered events not yet sent
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Flush the buffer every `interval` until the returned handle is aborted
    pub fn spawn_flush_loop(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                client.send_buffered().await;
            }
        })
    }

    async fn enqueue(&self, kind: &'static str, body: &impl Serialize) -> Result<()> {
        let event = IngestionEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            body: serde_json::to_value(body)?,
        };

        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(event);
            buffer.len() >= self.max_batch_size
        };

        if full {
            self.send_buffered().await;
        }
        Ok(())
    }

    /// Drain the buffer and send it; failures are logged and the batch dropped
    async fn send_buffered(&self) {
        let batch = std::mem::take(&mut *self.buffer.lock().await);
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        match self.send_batch(&batch).await {
            Ok(()) => tracing::debug!(count, "Langfuse batch sent"),
            Err(e) => tracing::error!(count, error = %e, "Failed to send Langfuse batch"),
        }
    }

    async fn send_batch(&self, batch: &[IngestionEvent]) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(&IngestionBatch { batch })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ObservabilityError::Http(format!(
                "ingestion returned {}: {}",
                status, body
            )));
        }

        let report: IngestionResponse = response.json().await.unwrap_or_default();
        for err in &report.errors {
            tracing::warn!(
                event_id = %err.id,
                status = err.status,
                message = ?err.message,
                "Langfuse rejected ingestion event"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl LangfuseClient for HttpClient {
    async fn generation(
        &self,
        generation: &Generation,
        parent_id: Option<&str>,
    ) -> Result<Generation> {
        let mut generation = generation.clone();
        if let Some(parent) = parent_id {
            generation.parent_observation_id = Some(parent.to_string());
        }
        self.enqueue("generation-create", &generation).await?;
        Ok(generation)
    }

    async fn generation_end(&self, generation: &Generation) -> Result<Generation> {
        self.enqueue("generation-update", generation).await?;
        Ok(generation.clone())
    }

    async fn span(&self, span: &Span, parent_id: Option<&str>) -> Result<Span> {
        let mut span = span.clone();
        if let Some(parent) = parent_id {
            span.parent_observation_id = Some(parent.to_string());
        }
        self.enqueue("span-create", &span).await?;
        Ok(span)
    }

    async fn span_end(&self, span: &Span) -> Result<Span> {
        self.enqueue("span-update", span).await?;
        Ok(span.clone())
    }

    async fn event(&self, event: &Event, parent_id: Option<&str>) -> Result<Event> {
        let mut event = event.clone();
        if let Some(parent) = parent_id {
            event.parent_observation_id = Some(parent.to_string());
        }
        self.enqueue("event-create", &event).await?;
        Ok(event)
    }

    async fn trace(&self, trace: &Trace) -> Result<Trace> {
        self.enqueue("trace-create", trace).await?;
        Ok(trace.clone())
    }

    async fn flush(&self) {
        self.send_buffered().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn offline_config() -> HttpClientConfig {
        HttpClientConfig {
            // discard port; connections are refused immediately
            host: "http://127.0.0.1:9/".to_string(),
            public_key: "pk-lf-test".to_string(),
            secret_key: "sk-lf-test".to_string(),
            max_batch_size: 3,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LANGFUSE_PUBLIC_KEY", "pk"),
            ("LANGFUSE_SECRET_KEY", "sk"),
        ]
        .into_iter()
        .collect();

        let config =
            HttpClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.public_key, "pk");

        let err = HttpClientConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains("LANGFUSE_PUBLIC_KEY"));
    }

    #[test]
    fn test_url_and_auth() {
        let config = offline_config();
        assert_eq!(config.ingestion_url(), "http://127.0.0.1:9/api/public/ingestion");
        // base64("pk-lf-test:sk-lf-test")
        assert_eq!(config.auth_header(), "Basic cGstbGYtdGVzdDpzay1sZi10ZXN0");
    }

    #[test]
    fn test_new_requires_keys() {
        let config = HttpClientConfig::default();
        assert!(matches!(
            HttpClient::new(config),
            Err(ObservabilityError::Config(_))
        ));
    }

    #[test]
    fn test_batch_wire_format() {
        let events = vec![IngestionEvent {
            id: "ev-1".to_string(),
            timestamp: Utc::now(),
            kind: "trace-create",
            body: serde_json::json!({"id": "trace-1"}),
        }];
        let json = serde_json::to_value(IngestionBatch { batch: &events }).unwrap();
        assert_eq!(json["batch"][0]["type"], "trace-create");
        assert_eq!(json["batch"][0]["body"]["id"], "trace-1");
    }

    #[tokio::test]
    async fn test_parent_id_set_on_payload() {
        let client = HttpClient::new(offline_config()).unwrap();
        let span = client
            .span(
                &Span {
                    id: "child".to_string(),
                    ..Default::default()
                },
                Some("parent"),
            )
            .await
            .unwrap();
        assert_eq!(span.parent_observation_id.as_deref(), Some("parent"));
        assert_eq!(client.pending().await, 1);
    }

    #[tokio::test]
    async fn test_full_buffer_is_drained_even_when_send_fails() {
        let client = HttpClient::new(offline_config()).unwrap();

        client.trace(&Trace::default()).await.unwrap();
        client.event(&Event::default(), None).await.unwrap();
        assert_eq!(client.pending().await, 2);

        client.span_end(&Span::default()).await.unwrap();
        assert_eq!(client.pending().await, 0);
    }

    #[tokio::test]
    async fn test_flush_empty_buffer_is_noop() {
        let client = HttpClient::new(offline_config()).unwrap();
        client.flush().await;
        assert_eq!(client.pending().await, 0);
    }
}
