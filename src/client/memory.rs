//! In-memory backend client for testing
//!
//! Records every call with its full arguments and lets tests inject errors
//! or override responses per method. Safe to share across tasks.

use super::model::{Event, Generation, Span, Trace};
use super::LangfuseClient;
use crate::error::{ObservabilityError, Result};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Recorded `generation` call
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub generation: Generation,
    pub parent_id: Option<String>,
}

/// Recorded `span` call
#[derive(Debug, Clone)]
pub struct SpanCall {
    pub span: Span,
    pub parent_id: Option<String>,
}

/// Recorded `event` call
#[derive(Debug, Clone)]
pub struct EventCall {
    pub event: Event,
    pub parent_id: Option<String>,
}

/// Failure injected into a single client method
///
/// Stored as a message because `ObservabilityError` is not `Clone`; each
/// call returns a fresh `Backend` error carrying it.
#[derive(Debug, Clone, Default)]
struct Faults {
    generation: Option<String>,
    generation_end: Option<String>,
    span: Option<String>,
    span_end: Option<String>,
    event: Option<String>,
    trace: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Responses {
    generation: Option<Generation>,
    generation_end: Option<Generation>,
    span: Option<Span>,
    span_end: Option<Span>,
    event: Option<Event>,
    trace: Option<Trace>,
}

#[derive(Debug, Default)]
struct Inner {
    generation_calls: Vec<GenerationCall>,
    generation_end_calls: Vec<Generation>,
    span_calls: Vec<SpanCall>,
    span_end_calls: Vec<Span>,
    event_calls: Vec<EventCall>,
    trace_calls: Vec<Trace>,
    flush_calls: usize,
    faults: Faults,
    responses: Responses,
}

/// Scriptable in-memory `LangfuseClient`
///
/// By default every create call succeeds and echoes its input, filling in
/// a placeholder id when the input id is empty. Injected errors take
/// precedence over response overrides, which take precedence over the echo.
#[derive(Debug, Default)]
pub struct MemoryClient {
    inner: Mutex<Inner>,
}

fn fault(operation: &str, reason: &Option<String>) -> Result<()> {
    match reason {
        Some(reason) => Err(ObservabilityError::backend(operation, reason.clone())),
        None => Ok(()),
    }
}

fn with_placeholder(id: &str, placeholder: &str) -> String {
    if id.is_empty() {
        placeholder.to_string()
    } else {
        id.to_string()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Error injection ────────────────────────────────────────

    pub fn with_generation_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.generation = Some(reason.into());
        self
    }

    pub fn with_generation_end_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.generation_end = Some(reason.into());
        self
    }

    pub fn with_span_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.span = Some(reason.into());
        self
    }

    pub fn with_span_end_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.span_end = Some(reason.into());
        self
    }

    pub fn with_event_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.event = Some(reason.into());
        self
    }

    pub fn with_trace_error(self, reason: impl Into<String>) -> Self {
        self.lock().faults.trace = Some(reason.into());
        self
    }

    /// Inject or clear a trace error on a shared client
    pub fn set_trace_error(&self, reason: Option<String>) {
        self.lock().faults.trace = reason;
    }

    /// Inject or clear a generation error on a shared client
    pub fn set_generation_error(&self, reason: Option<String>) {
        self.lock().faults.generation = reason;
    }

    // ─── Response overrides ─────────────────────────────────────

    pub fn with_generation_response(self, resp: Generation) -> Self {
        self.lock().responses.generation = Some(resp);
        self
    }

    pub fn with_generation_end_response(self, resp: Generation) -> Self {
        self.lock().responses.generation_end = Some(resp);
        self
    }

    pub fn with_span_response(self, resp: Span) -> Self {
        self.lock().responses.span = Some(resp);
        self
    }

    pub fn with_span_end_response(self, resp: Span) -> Self {
        self.lock().responses.span_end = Some(resp);
        self
    }

    pub fn with_event_response(self, resp: Event) -> Self {
        self.lock().responses.event = Some(resp);
        self
    }

    pub fn with_trace_response(self, resp: Trace) -> Self {
        self.lock().responses.trace = Some(resp);
        self
    }

    /// Clear recorded calls, injected errors and response overrides
    pub fn reset(&self) {
        *self.lock() = Inner::default();
    }

    // ─── Recorded calls ─────────────────────────────────────────

    pub fn generation_calls(&self) -> Vec<GenerationCall> {
        self.lock().generation_calls.clone()
    }

    pub fn generation_end_calls(&self) -> Vec<Generation> {
        self.lock().generation_end_calls.clone()
    }

    pub fn span_calls(&self) -> Vec<SpanCall> {
        self.lock().span_calls.clone()
    }

    pub fn span_end_calls(&self) -> Vec<Span> {
        self.lock().span_end_calls.clone()
    }

    pub fn event_calls(&self) -> Vec<EventCall> {
        self.lock().event_calls.clone()
    }

    pub fn trace_calls(&self) -> Vec<Trace> {
        self.lock().trace_calls.clone()
    }

    pub fn generation_call_count(&self) -> usize {
        self.lock().generation_calls.len()
    }

    pub fn generation_end_call_count(&self) -> usize {
        self.lock().generation_end_calls.len()
    }

    pub fn span_call_count(&self) -> usize {
        self.lock().span_calls.len()
    }

    pub fn span_end_call_count(&self) -> usize {
        self.lock().span_end_calls.len()
    }

    pub fn event_call_count(&self) -> usize {
        self.lock().event_calls.len()
    }

    pub fn trace_call_count(&self) -> usize {
        self.lock().trace_calls.len()
    }

    pub fn flush_call_count(&self) -> usize {
        self.lock().flush_calls
    }
}

#[async_trait]
impl LangfuseClient for MemoryClient {
    async fn generation(
        &self,
        generation: &Generation,
        parent_id: Option<&str>,
    ) -> Result<Generation> {
        let mut inner = self.lock();
        inner.generation_calls.push(GenerationCall {
            generation: generation.clone(),
            parent_id: parent_id.map(str::to_string),
        });
        fault("generation", &inner.faults.generation)?;
        if let Some(resp) = &inner.responses.generation {
            return Ok(resp.clone());
        }

        let mut result = generation.clone();
        result.id = with_placeholder(&result.id, "gen-mock-id");
        Ok(result)
    }

    async fn generation_end(&self, generation: &Generation) -> Result<Generation> {
        let mut inner = self.lock();
        inner.generation_end_calls.push(generation.clone());
        fault("generation_end", &inner.faults.generation_end)?;
        Ok(inner
            .responses
            .generation_end
            .clone()
            .unwrap_or_else(|| generation.clone()))
    }

    async fn span(&self, span: &Span, parent_id: Option<&str>) -> Result<Span> {
        let mut inner = self.lock();
        inner.span_calls.push(SpanCall {
            span: span.clone(),
            parent_id: parent_id.map(str::to_string),
        });
        fault("span", &inner.faults.span)?;
        if let Some(resp) = &inner.responses.span {
            return Ok(resp.clone());
        }

        let mut result = span.clone();
        result.id = with_placeholder(&result.id, "span-mock-id");
        Ok(result)
    }

    async fn span_end(&self, span: &Span) -> Result<Span> {
        let mut inner = self.lock();
        inner.span_end_calls.push(span.clone());
        fault("span_end", &inner.faults.span_end)?;
        Ok(inner
            .responses
            .span_end
            .clone()
            .unwrap_or_else(|| span.clone()))
    }

    async fn event(&self, event: &Event, parent_id: Option<&str>) -> Result<Event> {
        let mut inner = self.lock();
        inner.event_calls.push(EventCall {
            event: event.clone(),
            parent_id: parent_id.map(str::to_string),
        });
        fault("event", &inner.faults.event)?;
        if let Some(resp) = &inner.responses.event {
            return Ok(resp.clone());
        }

        let mut result = event.clone();
        result.id = with_placeholder(&result.id, "event-mock-id");
        Ok(result)
    }

    async fn trace(&self, trace: &Trace) -> Result<Trace> {
        let mut inner = self.lock();
        inner.trace_calls.push(trace.clone());
        fault("trace", &inner.faults.trace)?;
        if let Some(resp) = &inner.responses.trace {
            return Ok(resp.clone());
        }

        let mut result = trace.clone();
        result.id = with_placeholder(&result.id, "trace-mock-id");
        Ok(result)
    }

    async fn flush(&self) {
        self.lock().flush_calls += 1;
    }
}
