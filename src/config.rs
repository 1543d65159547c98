//! Provider configuration

use crate::error::{ObservabilityError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Langfuse cloud endpoint
pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

/// Langfuse provider configuration
///
/// Passed explicitly to the provider constructor; nothing here is read from
/// the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Langfuse API endpoint
    pub host: String,

    /// Public API key (required)
    pub public_key: String,

    /// Secret API key (required)
    pub secret_key: String,

    /// How often the backend client flushes its buffer.
    /// Informational: the client owns its flush schedule.
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,

    /// Fraction of observations forwarded to the backend, in `[0, 1]`
    pub sample_rate: f64,

    /// Deployment environment label (e.g. "production")
    pub environment: String,

    /// Application version, sent as the trace release
    pub version: String,

    /// Tags attached to every trace
    pub tags: Vec<String>,

    /// When false every recording call is a no-op
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            public_key: String::new(),
            secret_key: String::new(),
            flush_interval: default_flush_interval(),
            sample_rate: 1.0,
            environment: String::new(),
            version: String::new(),
            tags: Vec::new(),
            enabled: true,
        }
    }
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(1)
}

impl Config {
    /// Config with credentials and every other field at its default
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Apply defaults to unset optional fields, then check required ones
    pub fn validate(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = default_flush_interval();
        }

        if self.public_key.trim().is_empty() {
            return Err(ObservabilityError::Config(
                "public_key is required".to_string(),
            ));
        }
        if self.secret_key.trim().is_empty() {
            return Err(ObservabilityError::Config(
                "secret_key is required".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(ObservabilityError::Config(format!(
                "sample_rate must be between 0 and 1, got {}",
                self.sample_rate
            )));
        }

        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
