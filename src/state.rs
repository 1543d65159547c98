//! Session state tracking
//!
//! Maps caller-side identifiers to backend-assigned ones so later
//! observations can nest under earlier ones (trace → generation/span/event,
//! span → span). Entries live until `clear()`; there is no eviction.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Maps {
    /// trace/session id → backend trace id
    traces: HashMap<String, String>,
    /// generation id → backend generation id
    generations: HashMap<String, String>,
    /// span id → backend span id
    spans: HashMap<String, String>,
    /// traces that already received a display name
    named_traces: HashSet<String>,
}

/// Entry counts, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub traces: usize,
    pub generations: usize,
    pub spans: usize,
    pub named_traces: usize,
}

/// Thread-safe id registry shared by all recording calls of one provider
///
/// All four maps sit behind one lock, so `clear()` never exposes a
/// partially cleared state. Callers only ever receive owned copies.
#[derive(Debug, Default)]
pub struct SessionState {
    maps: RwLock<Maps>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // The maps hold plain strings, so a panic while holding the lock cannot
    // leave them inconsistent; recover from poisoning instead of failing.
    fn read(&self) -> RwLockReadGuard<'_, Maps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Maps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_trace_id(&self, session_id: &str, trace_id: &str) {
        self.write()
            .traces
            .insert(session_id.to_string(), trace_id.to_string());
    }

    /// Backend trace id, or an empty string if the trace was never created
    pub fn get_trace_id(&self, session_id: &str) -> String {
        self.read().traces.get(session_id).cloned().unwrap_or_default()
    }

    pub fn set_generation_id(&self, generation_id: &str, backend_id: &str) {
        self.write()
            .generations
            .insert(generation_id.to_string(), backend_id.to_string());
    }

    pub fn get_generation_id(&self, generation_id: &str) -> String {
        self.read()
            .generations
            .get(generation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_span_id(&self, span_id: &str, backend_id: &str) {
        self.write()
            .spans
            .insert(span_id.to_string(), backend_id.to_string());
    }

    pub fn get_span_id(&self, span_id: &str) -> String {
        self.read().spans.get(span_id).cloned().unwrap_or_default()
    }

    /// Mark a trace as named. Returns true only for the call that made the
    /// unset → set transition.
    pub fn set_trace_named_if_unset(&self, trace_id: &str) -> bool {
        self.write().named_traces.insert(trace_id.to_string())
    }

    /// Whether a trace already received a display name
    pub fn is_trace_named(&self, trace_id: &str) -> bool {
        self.read().named_traces.contains(trace_id)
    }

    /// Drop every mapping
    pub fn clear(&self) {
        let mut maps = self.write();
        maps.traces.clear();
        maps.generations.clear();
        maps.spans.clear();
        maps.named_traces.clear();
    }

    pub fn counts(&self) -> StateCounts {
        let maps = self.read();
        StateCounts {
            traces: maps.traces.len(),
            generations: maps.generations.len(),
            spans: maps.spans.len(),
            named_traces: maps.named_traces.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts() == StateCounts::default()
    }
}
