//! Observation → Langfuse metadata mapping
//!
//! Pure functions. Each builds a fresh map, adds known fields only when they
//! are set (non-empty, non-zero, non-nil), then merges the observation's
//! attributes last so caller-supplied keys override computed ones.

use crate::attributes::Attributes;
use crate::client::model::{Metadata, ObservationLevel};
use crate::types::{EventObservation, GenerationObservation, SpanObservation, TraceObservation};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Attribute key carrying prompt-cache read tokens
pub const CACHE_READ_TOKENS: &str = "cache_read_tokens";
/// Attribute key carrying prompt-cache write tokens
pub const CACHE_WRITE_TOKENS: &str = "cache_write_tokens";

fn put_str(map: &mut Metadata, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), Value::from(value));
    }
}

fn put_count(map: &mut Metadata, key: &str, value: i64) {
    if value > 0 {
        map.insert(key.to_string(), Value::from(value));
    }
}

fn put_uuid(map: &mut Metadata, key: &str, value: Uuid) {
    if !value.is_nil() {
        map.insert(key.to_string(), Value::from(value.to_string()));
    }
}

fn put_duration(map: &mut Metadata, key: &str, value: Duration) {
    if !value.is_zero() {
        map.insert(key.to_string(), Value::from(value.as_millis() as u64));
    }
}

fn merge_attributes(map: &mut Metadata, attributes: &Attributes) {
    for (k, v) in attributes {
        map.insert(k.clone(), v.clone());
    }
}

pub fn map_generation(obs: &GenerationObservation) -> Metadata {
    let mut m = Metadata::new();

    put_str(&mut m, "model", &obs.model);
    put_str(&mut m, "provider", &obs.provider);
    put_str(&mut m, "finish_reason", &obs.finish_reason);

    put_count(&mut m, "prompt_messages", obs.prompt_messages);
    put_count(&mut m, "tools_count", obs.tools);
    put_count(&mut m, "tool_calls_count", obs.tool_calls);
    put_count(&mut m, "latency_ms", obs.latency_ms);

    put_str(&mut m, "prompt_content", &obs.prompt_content);
    put_str(&mut m, "completion_text", &obs.completion_text);
    put_uuid(&mut m, "tenant_id", obs.tenant_id);

    merge_attributes(&mut m, &obs.attributes);
    m
}

pub fn map_span(obs: &SpanObservation) -> Metadata {
    let mut m = Metadata::new();

    put_str(&mut m, "span_type", &obs.span_type);
    put_str(&mut m, "status", &obs.status);
    put_str(&mut m, "tool_name", &obs.tool_name);
    put_str(&mut m, "call_id", &obs.call_id);
    put_str(&mut m, "input", &obs.input);
    put_str(&mut m, "output", &obs.output);
    put_duration(&mut m, "duration_ms", obs.duration);
    put_uuid(&mut m, "tenant_id", obs.tenant_id);

    merge_attributes(&mut m, &obs.attributes);
    m
}

pub fn map_event(obs: &EventObservation) -> Metadata {
    let mut m = Metadata::new();

    put_str(&mut m, "event_type", &obs.event_type);
    put_str(&mut m, "message", &obs.message);
    put_str(&mut m, "level", &obs.level);
    put_uuid(&mut m, "tenant_id", obs.tenant_id);

    merge_attributes(&mut m, &obs.attributes);
    m
}

pub fn map_trace(obs: &TraceObservation) -> Metadata {
    let mut m = Metadata::new();

    put_str(&mut m, "status", &obs.status);
    put_uuid(&mut m, "user_id", obs.user_id);
    if obs.total_cost > 0.0 {
        m.insert("total_cost".to_string(), Value::from(obs.total_cost));
    }
    put_count(&mut m, "total_tokens", obs.total_tokens);
    put_duration(&mut m, "duration_ms", obs.duration);
    put_uuid(&mut m, "tenant_id", obs.tenant_id);

    merge_attributes(&mut m, &obs.attributes);
    m
}

/// Token usage map: `input`, `output`, `total` when positive, plus
/// `cache_read`/`cache_write` when the matching attribute is a positive
/// integer. Cache attributes of any other type are ignored.
pub fn extract_token_usage(obs: &GenerationObservation) -> Metadata {
    let mut usage = Metadata::new();

    put_count(&mut usage, "input", obs.prompt_tokens);
    put_count(&mut usage, "output", obs.completion_tokens);
    put_count(&mut usage, "total", obs.total_tokens);

    if let Some(n) = obs.attributes.get_i64(CACHE_READ_TOKENS) {
        put_count(&mut usage, "cache_read", n);
    }
    if let Some(n) = obs.attributes.get_i64(CACHE_WRITE_TOKENS) {
        put_count(&mut usage, "cache_write", n);
    }

    usage
}

/// Serialize to JSON text; empty string for `null` or on failure
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::Null) | Err(_) => String::new(),
        Ok(v) => v.to_string(),
    }
}

/// Map a free-form level onto a Langfuse observation level.
/// Matching is case-sensitive; anything unknown becomes `Default`.
pub fn map_level(level: &str) -> ObservationLevel {
    match level {
        "debug" => ObservationLevel::Debug,
        "warn" | "warning" => ObservationLevel::Warning,
        "error" => ObservationLevel::Error,
        _ => ObservationLevel::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn full_generation() -> GenerationObservation {
        GenerationObservation::new("gen-1", Uuid::new_v4())
            .with_tenant_id(Uuid::new_v4())
            .with_model("claude-3-5-sonnet-20241022")
            .with_provider("anthropic")
            .with_prompt_messages(5)
            .with_tools(3)
            .with_prompt_content("What is the revenue?")
            .with_tokens(1000, 500)
            .with_latency_ms(2000)
            .with_finish_reason("stop")
            .with_tool_calls(1)
            .with_completion_text("The revenue is $1M")
            .with_duration(Duration::from_secs(2))
            .with_attribute("custom_field", "custom_value")
            .with_attribute(CACHE_READ_TOKENS, 100)
            .with_attribute(CACHE_WRITE_TOKENS, 50)
    }

    #[test]
    fn test_map_generation_all_fields() {
        let obs = full_generation();
        let m = map_generation(&obs);

        assert_eq!(m["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(m["provider"], "anthropic");
        assert_eq!(m["finish_reason"], "stop");
        assert_eq!(m["prompt_messages"], 5);
        assert_eq!(m["tools_count"], 3);
        assert_eq!(m["tool_calls_count"], 1);
        assert_eq!(m["latency_ms"], 2000);
        assert_eq!(m["prompt_content"], "What is the revenue?");
        assert_eq!(m["completion_text"], "The revenue is $1M");
        assert_eq!(m["tenant_id"], obs.tenant_id.to_string());
        assert_eq!(m["custom_field"], "custom_value");
        assert_eq!(m[CACHE_READ_TOKENS], 100);
    }

    #[test]
    fn test_map_generation_omits_unset_fields() {
        let obs = GenerationObservation::new("gen-1", Uuid::new_v4());
        let m = map_generation(&obs);

        for key in [
            "model",
            "provider",
            "finish_reason",
            "prompt_messages",
            "tools_count",
            "tool_calls_count",
            "latency_ms",
            "prompt_content",
            "completion_text",
            "tenant_id",
        ] {
            assert!(!m.contains_key(key), "unexpected key {}", key);
        }
        assert!(m.is_empty());
    }

    #[test]
    fn test_attributes_override_computed_fields() {
        let obs = GenerationObservation::new("gen-1", Uuid::new_v4())
            .with_model("gpt-4")
            .with_provider("openai")
            .with_attribute("model", "custom")
            .with_attribute("provider", "custom-provider");

        let m = map_generation(&obs);
        assert_eq!(m["model"], "custom");
        assert_eq!(m["provider"], "custom-provider");
    }

    #[test]
    fn test_attribute_types_preserved() {
        let obs = GenerationObservation::new("gen-1", Uuid::new_v4())
            .with_attribute("string_val", "test")
            .with_attribute("int_val", 42)
            .with_attribute("float_val", 2.5)
            .with_attribute("bool_val", true)
            .with_attribute("array_val", json!(["a", "b"]))
            .with_attribute("map_val", json!({"x": 1}));

        let m = map_generation(&obs);
        assert_eq!(m["string_val"], json!("test"));
        assert!(m["int_val"].is_i64());
        assert!(m["float_val"].is_f64());
        assert_eq!(m["bool_val"], json!(true));
        assert_eq!(m["array_val"], json!(["a", "b"]));
        assert_eq!(m["map_val"], json!({"x": 1}));
    }

    #[test]
    fn test_map_span() {
        let obs = SpanObservation::new("span-1", Uuid::new_v4(), "execute_sql")
            .with_span_type("tool")
            .with_status("success")
            .with_tool_name("sql_execute")
            .with_call_id("call-456")
            .with_input(r#"{"query": "SELECT * FROM users"}"#)
            .with_output(r#"{"rows": 10}"#)
            .with_duration(Duration::from_millis(150))
            .with_attribute("database", "postgres");

        let m = map_span(&obs);
        assert_eq!(m["span_type"], "tool");
        assert_eq!(m["status"], "success");
        assert_eq!(m["tool_name"], "sql_execute");
        assert_eq!(m["call_id"], "call-456");
        assert_eq!(m["input"], r#"{"query": "SELECT * FROM users"}"#);
        assert_eq!(m["output"], r#"{"rows": 10}"#);
        assert_eq!(m["duration_ms"], 150);
        assert_eq!(m["database"], "postgres");
    }

    #[test]
    fn test_map_span_minimal() {
        let obs = SpanObservation::new("span-1", Uuid::new_v4(), "custom_operation");
        assert!(map_span(&obs).is_empty());
    }

    #[test]
    fn test_map_event() {
        let obs = EventObservation::new("ev-1", Uuid::new_v4(), "interrupt")
            .with_event_type("session")
            .with_message("User clarification required")
            .with_level("warn")
            .with_attribute("question_id", "q-789");

        let m = map_event(&obs);
        assert_eq!(m["event_type"], "session");
        assert_eq!(m["message"], "User clarification required");
        assert_eq!(m["level"], "warn");
        assert_eq!(m["question_id"], "q-789");

        let minimal = EventObservation::new("ev-2", Uuid::new_v4(), "simple_event");
        assert!(map_event(&minimal).is_empty());
    }

    #[test]
    fn test_map_trace() {
        let user = Uuid::new_v4();
        let obs = TraceObservation::new(Uuid::new_v4(), "BI Analysis Session")
            .with_status("completed")
            .with_user_id(user)
            .with_total_cost(0.05)
            .with_total_tokens(2500)
            .with_attribute("agent", "default_agent");

        let m = map_trace(&obs);
        assert_eq!(m["status"], "completed");
        assert_eq!(m["user_id"], user.to_string());
        assert_eq!(m["total_cost"], 0.05);
        assert_eq!(m["total_tokens"], 2500);
        assert_eq!(m["agent"], "default_agent");
    }

    #[test]
    fn test_map_trace_nil_user_and_zero_totals() {
        let obs = TraceObservation::new(Uuid::new_v4(), "Trace");
        let m = map_trace(&obs);
        assert!(!m.contains_key("user_id"));
        assert!(!m.contains_key("total_cost"));
        assert!(!m.contains_key("total_tokens"));
    }

    #[test]
    fn test_extract_token_usage() {
        let obs = GenerationObservation::new("g", Uuid::new_v4())
            .with_tokens(500, 250)
            .with_attribute(CACHE_READ_TOKENS, 100)
            .with_attribute(CACHE_WRITE_TOKENS, 50);

        let usage = extract_token_usage(&obs);
        assert_eq!(usage["input"], 500);
        assert_eq!(usage["output"], 250);
        assert_eq!(usage["total"], 750);
        assert_eq!(usage["cache_read"], 100);
        assert_eq!(usage["cache_write"], 50);
    }

    #[test]
    fn test_extract_token_usage_ignores_bad_cache_types() {
        let obs = GenerationObservation::new("g", Uuid::new_v4())
            .with_tokens(100, 50)
            .with_attribute(CACHE_READ_TOKENS, "bad")
            .with_attribute(CACHE_WRITE_TOKENS, 2.5);

        let usage = extract_token_usage(&obs);
        assert_eq!(usage["input"], 100);
        assert!(!usage.contains_key("cache_read"));
        assert!(!usage.contains_key("cache_write"));
    }

    #[test]
    fn test_extract_token_usage_zero_values() {
        let obs = GenerationObservation::new("g", Uuid::new_v4())
            .with_attribute(CACHE_READ_TOKENS, 0)
            .with_attribute(CACHE_WRITE_TOKENS, 0);

        assert!(extract_token_usage(&obs).is_empty());
    }

    #[test]
    fn test_to_json_string() {
        let s = to_json_string(&json!({"key1": "value1", "key2": 42}));
        assert!(s.contains("key1"));
        assert!(s.contains("value1"));

        assert_eq!(to_json_string(&Value::Null), "");
        assert_eq!(to_json_string(&None::<String>), "");

        // tuple keys cannot become JSON object keys
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "x");
        assert_eq!(to_json_string(&bad), "");
    }

    #[test]
    fn test_map_level() {
        assert_eq!(map_level("info"), ObservationLevel::Default);
        assert_eq!(map_level("warn"), ObservationLevel::Warning);
        assert_eq!(map_level("warning"), ObservationLevel::Warning);
        assert_eq!(map_level("error"), ObservationLevel::Error);
        assert_eq!(map_level("debug"), ObservationLevel::Debug);
        assert_eq!(map_level("unknown"), ObservationLevel::Default);
        assert_eq!(map_level(""), ObservationLevel::Default);
        assert_eq!(map_level("INFO"), ObservationLevel::Default);
    }
}
