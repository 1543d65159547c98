//! Observation provider trait, the core abstraction for tracing backends
//!
//! All observability backends (Langfuse, no-op, etc.) implement
//! `ObservabilityProvider` so calling code can record generations, spans,
//! events and traces without knowing where they end up.

use crate::error::Result;
use crate::types::{EventObservation, GenerationObservation, SpanObservation, TraceObservation};
use async_trait::async_trait;

pub mod langfuse;

pub use langfuse::{LangfuseProvider, ProviderBuilder};

/// Core trait for observation sinks
///
/// Recording never fails because of the backend: implementations log
/// backend errors and return `Ok(())`. Dropping a returned future cancels
/// whatever backend call it was waiting on.
#[async_trait]
pub trait ObservabilityProvider: Send + Sync {
    /// Record one completed LLM call
    async fn record_generation(&self, obs: GenerationObservation) -> Result<()>;

    /// Record one completed operation
    async fn record_span(&self, obs: SpanObservation) -> Result<()>;

    /// Record one point-in-time occurrence
    async fn record_event(&self, obs: EventObservation) -> Result<()>;

    /// Record a whole trace
    async fn record_trace(&self, obs: TraceObservation) -> Result<()>;

    /// Push pending observations to the backend
    async fn flush(&self) -> Result<()>;

    /// Flush, then release per-session state
    async fn shutdown(&self) -> Result<()>;

    /// Provider name (e.g., "langfuse", "noop")
    fn name(&self) -> &str;
}

/// Provider that accepts every observation and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

#[async_trait]
impl ObservabilityProvider for NoopProvider {
    async fn record_generation(&self, _obs: GenerationObservation) -> Result<()> {
        Ok(())
    }

    async fn record_span(&self, _obs: SpanObservation) -> Result<()> {
        Ok(())
    }

    async fn record_event(&self, _obs: EventObservation) -> Result<()> {
        Ok(())
    }

    async fn record_trace(&self, _obs: TraceObservation) -> Result<()> {
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
