//! # a3s-observability
//!
//! LLM observation tracing (traces, generations, spans, events) for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-observability` provides a backend-agnostic API for recording what an
//! LLM-driven application does: each completion call, each tool execution,
//! each notable occurrence, grouped into one trace per session. Recording
//! never fails the caller; backend outages are logged and swallowed.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_observability::{Config, GenerationObservation, LangfuseProvider, ObservabilityProvider};
//! use a3s_observability::client::MemoryClient;
//!
//! # async fn example() -> a3s_observability::Result<()> {
//! let client = Arc::new(MemoryClient::new());
//! let provider = LangfuseProvider::new(client, Config::new("pk-lf-...", "sk-lf-..."))?;
//!
//! let session = uuid::Uuid::new_v4();
//! provider
//!     .record_generation(
//!         GenerationObservation::new("gen-1", session)
//!             .with_model("gpt-4")
//!             .with_tokens(120, 48),
//!     )
//!     .await?;
//!
//! provider.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - **langfuse**: maps observations onto the Langfuse data model
//! - **noop**: accepts everything, records nothing
//!
//! ## Architecture
//!
//! - **ObservabilityProvider** trait: the observation sink calling code uses
//! - **LangfuseClient** trait: narrow backend port (HTTP adapter, in-memory double)
//! - **SessionState**: id mappings used for nesting and trace deduplication
//! - **mapper** / **policy**: pure metadata mapping, cost and sampling

pub mod attributes;
pub mod client;
pub mod config;
pub mod error;
pub mod mapper;
pub mod policy;
pub mod provider;
pub mod state;
pub mod types;

// Re-export core types
pub use attributes::Attributes;
pub use config::Config;
pub use error::{ObservabilityError, Result};
pub use provider::{LangfuseProvider, NoopProvider, ObservabilityProvider, ProviderBuilder};
pub use state::SessionState;
pub use types::{EventObservation, GenerationObservation, SpanObservation, TraceObservation};

// Re-export clients for convenience
pub use client::{HttpClient, HttpClientConfig, LangfuseClient, MemoryClient};
