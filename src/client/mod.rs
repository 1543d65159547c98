//! Backend client abstraction
//!
//! `LangfuseClient` is the narrow capability the provider consumes. Two
//! implementations ship with the crate:
//!
//! - **http**: buffers ingestion events and sends them to the Langfuse API
//! - **memory**: scriptable in-memory double for tests

use crate::error::Result;
use async_trait::async_trait;

pub mod http;
pub mod memory;
pub mod model;

pub use http::{HttpClient, HttpClientConfig};
pub use memory::MemoryClient;
pub use model::{Event, Generation, Metadata, ObservationLevel, Span, Trace, Usage, UsageUnit};

/// Operations the provider needs from a tracing backend
///
/// Create calls return the backend's view of the observation; the provider
/// only uses the result to decide success. Parent ids are passed separately
/// so implementations can resolve nesting however their API requires.
#[async_trait]
pub trait LangfuseClient: Send + Sync {
    /// Create a generation, optionally nested under a parent observation
    async fn generation(&self, generation: &Generation, parent_id: Option<&str>)
        -> Result<Generation>;

    /// Mark a generation as complete (carries the end time)
    async fn generation_end(&self, generation: &Generation) -> Result<Generation>;

    /// Create a span, optionally nested under a parent observation
    async fn span(&self, span: &Span, parent_id: Option<&str>) -> Result<Span>;

    /// Mark a span as complete (carries the end time)
    async fn span_end(&self, span: &Span) -> Result<Span>;

    /// Create an event, optionally nested under a parent observation
    async fn event(&self, event: &Event, parent_id: Option<&str>) -> Result<Event>;

    /// Create or update a trace. Backends upsert by id.
    async fn trace(&self, trace: &Trace) -> Result<Trace>;

    /// Send everything buffered. Failures are the client's to log.
    async fn flush(&self);
}
