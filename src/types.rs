//! Observation records handed to providers by calling code
//!
//! Observations are transient value objects: built by the caller, consumed
//! once by a provider's `record_*` method, never retained. A session id is
//! the trace identity unless an explicit `trace_id` is given.

use crate::attributes::Attributes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// One LLM completion call
#[derive(Debug, Clone)]
pub struct GenerationObservation {
    /// Caller-assigned observation id
    pub id: String,
    /// Explicit trace id; empty means "use the session id"
    pub trace_id: String,
    /// Span this generation nests under, if any
    pub parent_id: String,
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,

    pub model: String,
    pub provider: String,
    pub model_parameters: Option<Value>,

    /// Number of messages in the prompt
    pub prompt_messages: i64,
    pub prompt_tokens: i64,
    /// Number of tools offered to the model
    pub tools: i64,
    pub prompt_content: String,

    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub latency_ms: i64,
    pub finish_reason: String,
    /// Number of tool calls the model made
    pub tool_calls: i64,
    pub completion_text: String,

    pub duration: Duration,
    pub level: String,

    /// End-user identity propagated onto the trace
    pub user_id: String,
    pub user_email: String,
    pub input: Option<Value>,
    pub output: Option<Value>,

    pub attributes: Attributes,
}

/// One bounded operation (tool execution, processing step)
#[derive(Debug, Clone)]
pub struct SpanObservation {
    pub id: String,
    pub trace_id: String,
    pub parent_id: String,
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,

    pub name: String,
    pub span_type: String,
    pub input: String,
    pub output: String,
    pub duration: Duration,
    pub status: String,
    pub level: String,

    pub tool_name: String,
    pub call_id: String,

    pub attributes: Attributes,
}

/// One instantaneous occurrence (error, warning, info)
#[derive(Debug, Clone)]
pub struct EventObservation {
    pub id: String,
    pub trace_id: String,
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,

    pub name: String,
    pub event_type: String,
    pub message: String,
    /// "debug", "info", "warn"/"warning" or "error"
    pub level: String,

    pub attributes: Attributes,
}

/// One end-to-end session
#[derive(Debug, Clone)]
pub struct TraceObservation {
    pub id: String,
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,

    pub name: String,
    pub duration: Duration,
    pub status: String,
    /// Nil UUID means "no user"
    pub user_id: Uuid,
    pub total_cost: f64,
    pub total_tokens: i64,

    pub attributes: Attributes,
}

/// Trimmed explicit trace id, falling back to the session id
pub fn resolve_trace_id(explicit: &str, session_id: Uuid) -> String {
    let explicit = explicit.trim();
    if explicit.is_empty() {
        session_id.to_string()
    } else {
        explicit.to_string()
    }
}

/// `start + duration`, saturating to `start` when the duration overflows
pub fn end_time(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(start)
}

macro_rules! with_setters {
    ($ty:ty { $($method:ident => $field:ident : $arg:ty),* $(,)? }) => {
        impl $ty {
            $(
                pub fn $method(mut self, value: impl Into<$arg>) -> Self {
                    self.$field = value.into();
                    self
                }
            )*
        }
    };
}

impl Default for GenerationObservation {
    fn default() -> Self {
        Self {
            id: String::new(),
            trace_id: String::new(),
            parent_id: String::new(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
            model: String::new(),
            provider: String::new(),
            model_parameters: None,
            prompt_messages: 0,
            prompt_tokens: 0,
            tools: 0,
            prompt_content: String::new(),
            completion_tokens: 0,
            total_tokens: 0,
            latency_ms: 0,
            finish_reason: String::new(),
            tool_calls: 0,
            completion_text: String::new(),
            duration: Duration::ZERO,
            level: String::new(),
            user_id: String::new(),
            user_email: String::new(),
            input: None,
            output: None,
            attributes: Attributes::new(),
        }
    }
}

impl GenerationObservation {
    /// Create a generation stamped with the current time
    pub fn new(id: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            id: id.into(),
            session_id,
            ..Default::default()
        }
    }

    /// Trace this generation belongs to
    pub fn resolved_trace_id(&self) -> String {
        resolve_trace_id(&self.trace_id, self.session_id)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        end_time(self.timestamp, self.duration)
    }

    /// Set prompt/completion tokens and their sum
    pub fn with_tokens(mut self, prompt: i64, completion: i64) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self.total_tokens = prompt + completion;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }
}

with_setters!(GenerationObservation {
    with_trace_id => trace_id: String,
    with_parent_id => parent_id: String,
    with_tenant_id => tenant_id: Uuid,
    with_timestamp => timestamp: DateTime<Utc>,
    with_model => model: String,
    with_provider => provider: String,
    with_prompt_messages => prompt_messages: i64,
    with_prompt_tokens => prompt_tokens: i64,
    with_tools => tools: i64,
    with_prompt_content => prompt_content: String,
    with_completion_tokens => completion_tokens: i64,
    with_total_tokens => total_tokens: i64,
    with_latency_ms => latency_ms: i64,
    with_finish_reason => finish_reason: String,
    with_tool_calls => tool_calls: i64,
    with_completion_text => completion_text: String,
    with_duration => duration: Duration,
    with_level => level: String,
    with_user_id => user_id: String,
    with_user_email => user_email: String,
    with_attributes => attributes: Attributes,
});

impl Default for SpanObservation {
    fn default() -> Self {
        Self {
            id: String::new(),
            trace_id: String::new(),
            parent_id: String::new(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
            name: String::new(),
            span_type: String::new(),
            input: String::new(),
            output: String::new(),
            duration: Duration::ZERO,
            status: String::new(),
            level: String::new(),
            tool_name: String::new(),
            call_id: String::new(),
            attributes: Attributes::new(),
        }
    }
}

impl SpanObservation {
    pub fn new(id: impl Into<String>, session_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn resolved_trace_id(&self) -> String {
        resolve_trace_id(&self.trace_id, self.session_id)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        end_time(self.timestamp, self.duration)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(key, value);
        self
    }
}

with_setters!(SpanObservation {
    with_trace_id => trace_id: String,
    with_parent_id => parent_id: String,
    with_tenant_id => tenant_id: Uuid,
    with_timestamp => timestamp: DateTime<Utc>,
    with_span_type => span_type: String,
    with_input => input: String,
    with_output => output: String,
    with_duration => duration: Duration,
    with_status => status: String,
    with_level => level: String,
    with_tool_name => tool_name: String,
    with_call_id => call_id: String,
    with_attributes => attributes: Attributes,
});

impl Default for EventObservation {
    fn default() -> Self {
        Self {
            id: String::new(),
            trace_id: String::new(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
            name: String::new(),
            event_type: String::new(),
            message: String::new(),
            level: String::new(),
            attributes: Attributes::new(),
        }
    }
}

impl EventObservation {
    pub fn new(id: impl Into<String>, session_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn resolved_trace_id(&self) -> String {
        resolve_trace_id(&self.trace_id, self.session_id)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(key, value);
        self
    }
}

with_setters!(EventObservation {
    with_trace_id => trace_id: String,
    with_tenant_id => tenant_id: Uuid,
    with_timestamp => timestamp: DateTime<Utc>,
    with_event_type => event_type: String,
    with_message => message: String,
    with_level => level: String,
    with_attributes => attributes: Attributes,
});

impl Default for TraceObservation {
    fn default() -> Self {
        Self {
            id: String::new(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            timestamp: Utc::now(),
            name: String::new(),
            duration: Duration::ZERO,
            status: String::new(),
            user_id: Uuid::nil(),
            total_cost: 0.0,
            total_tokens: 0,
            attributes: Attributes::new(),
        }
    }
}

impl TraceObservation {
    pub fn new(session_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            session_id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trace id: the explicit `id` if set, otherwise the session id
    pub fn resolved_trace_id(&self) -> String {
        resolve_trace_id(&self.id, self.session_id)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(key, value);
        self
    }
}

with_setters!(TraceObservation {
    with_id => id: String,
    with_tenant_id => tenant_id: Uuid,
    with_timestamp => timestamp: DateTime<Utc>,
    with_duration => duration: Duration,
    with_status => status: String,
    with_user_id => user_id: Uuid,
    with_total_cost => total_cost: f64,
    with_total_tokens => total_tokens: i64,
    with_attributes => attributes: Attributes,
});
