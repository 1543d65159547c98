//! Langfuse observability provider
//!
//! Implements `ObservabilityProvider` on top of any `LangfuseClient`.
//! Every recording call checks enablement, then sampling, makes sure the
//! parent trace exists, maps the observation to Langfuse metadata and
//! calls the backend. Backend failures are logged and swallowed.

use crate::client::model::{Event, Generation, Metadata, Span, Trace, Usage, UsageUnit};
use crate::client::LangfuseClient;
use crate::config::Config;
use crate::error::{ObservabilityError, Result};
use crate::mapper::{self, CACHE_READ_TOKENS, CACHE_WRITE_TOKENS};
use crate::policy::{calculate_cost, Sampler};
use crate::provider::ObservabilityProvider;
use crate::state::SessionState;
use crate::types::{EventObservation, GenerationObservation, SpanObservation, TraceObservation};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Name given to traces created implicitly for a new session
pub const DEFAULT_TRACE_NAME: &str = "Chat Run";

/// Longest trace name derived from a prompt, in characters
const PROMPT_TRACE_NAME_LEN: usize = 80;

fn log_failure(operation: &str, observation_id: &str, err: &ObservabilityError) {
    tracing::error!(
        operation,
        observation_id,
        error = %err,
        "Langfuse operation failed"
    );
}

fn prompt_trace_name(prompt: &str) -> String {
    prompt.trim().chars().take(PROMPT_TRACE_NAME_LEN).collect()
}

fn non_empty_value(s: &str) -> Option<Value> {
    (!s.is_empty()).then(|| Value::from(s))
}

/// Langfuse-backed observation sink
///
/// Cheap to share behind an `Arc`; all mutable state lives in the
/// thread-safe `SessionState` and the sampler.
pub struct LangfuseProvider {
    client: Arc<dyn LangfuseClient>,
    config: Config,
    state: SessionState,
    sampler: Sampler,
}

impl std::fmt::Debug for LangfuseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseProvider")
            .field("host", &self.config.host)
            .field("enabled", &self.config.enabled)
            .field("sample_rate", &self.config.sample_rate)
            .field("state", &self.state.counts())
            .finish()
    }
}

impl LangfuseProvider {
    /// Validate `config` (applying defaults) and wrap `client`
    pub fn new(client: Arc<dyn LangfuseClient>, config: Config) -> Result<Self> {
        Self::builder().client(client).config(config).build()
    }

    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    /// Effective configuration, defaults applied
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identifier mappings kept for nesting
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Rename an existing trace, e.g. once a chat title is known
    ///
    /// Once the backend accepts the name the trace counts as named: prompts
    /// recorded later do not overwrite it, and a trace created implicitly
    /// afterwards is sent without the default name.
    pub async fn update_trace_name(&self, trace_id: &str, name: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let trace = Trace {
            id: trace_id.to_string(),
            name: name.to_string(),
            ..Default::default()
        };
        if let Err(e) = self.client.trace(&trace).await {
            log_failure("update_trace_name", trace_id, &e);
            return Ok(());
        }
        self.state.set_trace_named_if_unset(trace_id);

        tracing::debug!(trace_id, name, "Langfuse trace renamed");
        Ok(())
    }

    /// Replace a trace's tags with `tags` plus the configured tags,
    /// deduplicated and sorted
    pub async fn update_trace_tags<I, S>(&self, trace_id: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let merged: BTreeSet<String> = self
            .config
            .tags
            .iter()
            .cloned()
            .chain(tags.into_iter().map(Into::into))
            .collect();
        let trace = Trace {
            id: trace_id.to_string(),
            tags: merged.into_iter().collect(),
            ..Default::default()
        };
        if let Err(e) = self.client.trace(&trace).await {
            log_failure("update_trace_tags", trace_id, &e);
            return Ok(());
        }

        tracing::debug!(trace_id, tags = ?trace.tags, "Langfuse trace tags updated");
        Ok(())
    }

    /// Enablement first so a disabled provider never touches the sampler
    fn admit(&self) -> bool {
        self.config.enabled && self.sampler.should_sample()
    }

    fn release(&self) -> String {
        self.config.version.clone()
    }

    /// Create the trace once per trace id. Two concurrent first
    /// observations may both create it; trace creation is idempotent by id.
    async fn ensure_trace(
        &self,
        trace_id: &str,
        session_id: Uuid,
        tenant_id: Uuid,
        user_id: &str,
        user_email: &str,
    ) -> Result<()> {
        if !self.state.get_trace_id(trace_id).is_empty() {
            return Ok(());
        }

        let mut metadata = Metadata::new();
        if !tenant_id.is_nil() {
            metadata.insert("tenant_id".to_string(), Value::from(tenant_id.to_string()));
        }
        if !self.config.environment.is_empty() {
            metadata.insert(
                "environment".to_string(),
                Value::from(self.config.environment.as_str()),
            );
        }
        if !user_email.is_empty() {
            metadata.insert("user_email".to_string(), Value::from(user_email));
        }

        // an empty name leaves an earlier explicit title in place
        let name = if self.state.is_trace_named(trace_id) {
            String::new()
        } else {
            DEFAULT_TRACE_NAME.to_string()
        };
        let trace = Trace {
            id: trace_id.to_string(),
            name,
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            release: self.release(),
            metadata,
            tags: self.config.tags.clone(),
            ..Default::default()
        };
        self.client.trace(&trace).await?;

        self.state.set_trace_id(trace_id, trace_id);
        tracing::debug!(trace_id, "Langfuse trace created");
        Ok(())
    }

    /// Push input/output, user identity and a first name onto the trace
    async fn update_trace_from_generation(&self, trace_id: &str, obs: &GenerationObservation) {
        let name = if !obs.prompt_content.trim().is_empty()
            && self.state.set_trace_named_if_unset(trace_id)
        {
            prompt_trace_name(&obs.prompt_content)
        } else {
            String::new()
        };

        if obs.input.is_none()
            && obs.output.is_none()
            && obs.user_id.is_empty()
            && obs.user_email.is_empty()
            && name.is_empty()
        {
            return;
        }

        let mut metadata = Metadata::new();
        if !obs.user_email.is_empty() {
            metadata.insert("user_email".to_string(), Value::from(obs.user_email.as_str()));
        }

        let trace = Trace {
            id: trace_id.to_string(),
            name,
            user_id: obs.user_id.clone(),
            release: self.release(),
            input: obs.input.clone(),
            output: obs.output.clone(),
            metadata,
            ..Default::default()
        };
        if let Err(e) = self.client.trace(&trace).await {
            log_failure("update_trace", &obs.id, &e);
        }
    }
}

#[async_trait]
impl ObservabilityProvider for LangfuseProvider {
    async fn record_generation(&self, obs: GenerationObservation) -> Result<()> {
        if !self.admit() {
            return Ok(());
        }

        let trace_id = obs.resolved_trace_id();
        if let Err(e) = self
            .ensure_trace(
                &trace_id,
                obs.session_id,
                obs.tenant_id,
                &obs.user_id,
                &obs.user_email,
            )
            .await
        {
            log_failure("ensure_trace", &obs.id, &e);
            return Ok(());
        }

        let mut metadata = mapper::map_generation(&obs);
        let token_usage = mapper::extract_token_usage(&obs);
        for (usage_key, metadata_key) in [
            ("cache_read", CACHE_READ_TOKENS),
            ("cache_write", CACHE_WRITE_TOKENS),
        ] {
            if let Some(count) = token_usage.get(usage_key) {
                metadata.insert(metadata_key.to_string(), count.clone());
            }
        }

        let cost = calculate_cost(&obs);
        let end_time = obs.end_time();
        let mut generation = Generation {
            id: obs.id.clone(),
            trace_id: trace_id.clone(),
            name: obs.model.clone(),
            start_time: Some(obs.timestamp),
            completion_start_time: Some(end_time),
            model: obs.model.clone(),
            model_parameters: obs.model_parameters.clone(),
            input: obs.input.clone(),
            output: obs.output.clone(),
            usage: Usage {
                input: obs.prompt_tokens,
                output: obs.completion_tokens,
                total: obs.total_tokens,
                unit: UsageUnit::Tokens,
                total_cost: (cost > 0.0).then_some(cost),
            },
            metadata,
            level: mapper::map_level(&obs.level),
            ..Default::default()
        };

        // an unmapped parent id may already be the backend span id
        let parent_id = (!obs.parent_id.is_empty()).then(|| {
            let mapped = self.state.get_span_id(&obs.parent_id);
            if mapped.is_empty() {
                obs.parent_id.clone()
            } else {
                mapped
            }
        });

        if let Err(e) = self
            .client
            .generation(&generation, parent_id.as_deref())
            .await
        {
            log_failure("generation", &obs.id, &e);
            return Ok(());
        }
        self.state.set_generation_id(&obs.id, &obs.id);

        self.update_trace_from_generation(&trace_id, &obs).await;

        generation.end_time = Some(end_time);
        if let Err(e) = self.client.generation_end(&generation).await {
            log_failure("generation_end", &obs.id, &e);
            return Ok(());
        }

        tracing::debug!(
            observation_id = %obs.id,
            model = %obs.model,
            tokens = obs.total_tokens,
            cost,
            "Langfuse generation recorded"
        );
        Ok(())
    }

    async fn record_span(&self, obs: SpanObservation) -> Result<()> {
        if !self.admit() {
            return Ok(());
        }

        let trace_id = obs.resolved_trace_id();
        if let Err(e) = self
            .ensure_trace(&trace_id, obs.session_id, obs.tenant_id, "", "")
            .await
        {
            log_failure("ensure_trace", &obs.id, &e);
            return Ok(());
        }

        let parent_id = Some(self.state.get_span_id(&obs.parent_id))
            .filter(|id| !obs.parent_id.is_empty() && !id.is_empty());

        let mut span = Span {
            id: obs.id.clone(),
            trace_id,
            name: obs.name.clone(),
            start_time: Some(obs.timestamp),
            input: non_empty_value(&obs.input),
            output: non_empty_value(&obs.output),
            metadata: mapper::map_span(&obs),
            level: mapper::map_level(&obs.level),
            ..Default::default()
        };

        if let Err(e) = self.client.span(&span, parent_id.as_deref()).await {
            log_failure("span", &obs.id, &e);
            return Ok(());
        }
        self.state.set_span_id(&obs.id, &obs.id);

        span.end_time = Some(obs.end_time());
        if let Err(e) = self.client.span_end(&span).await {
            log_failure("span_end", &obs.id, &e);
            return Ok(());
        }

        tracing::debug!(
            observation_id = %obs.id,
            name = %obs.name,
            duration = ?obs.duration,
            "Langfuse span recorded"
        );
        Ok(())
    }

    async fn record_event(&self, obs: EventObservation) -> Result<()> {
        if !self.admit() {
            return Ok(());
        }

        let trace_id = obs.resolved_trace_id();
        if let Err(e) = self
            .ensure_trace(&trace_id, obs.session_id, obs.tenant_id, "", "")
            .await
        {
            log_failure("ensure_trace", &obs.id, &e);
            return Ok(());
        }

        let event = Event {
            id: obs.id.clone(),
            trace_id,
            name: obs.name.clone(),
            start_time: Some(obs.timestamp),
            metadata: mapper::map_event(&obs),
            level: mapper::map_level(&obs.level),
            ..Default::default()
        };

        if let Err(e) = self.client.event(&event, None).await {
            log_failure("event", &obs.id, &e);
            return Ok(());
        }

        tracing::debug!(
            observation_id = %obs.id,
            name = %obs.name,
            level = %obs.level,
            "Langfuse event recorded"
        );
        Ok(())
    }

    async fn record_trace(&self, obs: TraceObservation) -> Result<()> {
        if !self.admit() {
            return Ok(());
        }

        let mut metadata = mapper::map_trace(&obs);
        if !self.config.environment.is_empty() {
            metadata.insert(
                "environment".to_string(),
                Value::from(self.config.environment.as_str()),
            );
        }
        if !self.config.version.is_empty() {
            metadata.insert(
                "version".to_string(),
                Value::from(self.config.version.as_str()),
            );
        }

        let trace_id = obs.resolved_trace_id();
        let trace = Trace {
            id: trace_id.clone(),
            timestamp: Some(obs.timestamp),
            name: obs.name.clone(),
            user_id: if obs.user_id.is_nil() {
                String::new()
            } else {
                obs.user_id.to_string()
            },
            session_id: obs.session_id.to_string(),
            release: self.release(),
            metadata,
            tags: self.config.tags.clone(),
            ..Default::default()
        };

        if let Err(e) = self.client.trace(&trace).await {
            log_failure("trace", &trace_id, &e);
            return Ok(());
        }
        self.state.set_trace_id(&trace_id, &trace_id);
        if !obs.name.is_empty() {
            self.state.set_trace_named_if_unset(&trace_id);
        }

        tracing::debug!(
            trace_id = %trace_id,
            name = %obs.name,
            tokens = obs.total_tokens,
            cost = obs.total_cost,
            "Langfuse trace recorded"
        );
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        tracing::debug!("Flushing pending Langfuse observations");
        self.client.flush().await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        tracing::info!("Shutting down Langfuse provider");
        if let Err(e) = self.flush().await {
            tracing::error!(error = %e, "Langfuse flush failed during shutdown");
        }
        self.state.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "langfuse"
    }
}

/// Builder for `LangfuseProvider`
///
/// A client is mandatory; `build()` fails with `MissingClient` otherwise.
#[derive(Default)]
pub struct ProviderBuilder {
    client: Option<Arc<dyn LangfuseClient>>,
    config: Option<Config>,
    seed: Option<u64>,
}

impl ProviderBuilder {
    pub fn client(mut self, client: Arc<dyn LangfuseClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Seed the sampler for reproducible sampling decisions
    pub fn sampler_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<LangfuseProvider> {
        let client = self.client.ok_or(ObservabilityError::MissingClient)?;
        let mut config = self.config.unwrap_or_default();
        config.validate()?;

        let sampler = match self.seed {
            Some(seed) => Sampler::with_seed(config.sample_rate, seed),
            None => Sampler::new(config.sample_rate),
        };

        tracing::info!(
            host = %config.host,
            enabled = config.enabled,
            sample_rate = config.sample_rate,
            environment = %config.environment,
            "Langfuse provider initialized"
        );

        Ok(LangfuseProvider {
            client,
            config,
            state: SessionState::new(),
            sampler,
        })
    }
}
