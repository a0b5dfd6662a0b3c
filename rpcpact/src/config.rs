//! Configuration types for collectors, replay and the contract broker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::diff::AssertOpts;

/// Contract broker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Mirror base URLs; requests race across all of them.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Optional contract tag appended to the contract path.
    #[serde(default)]
    pub tag: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_timeout() -> f64 {
    30.0
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            tag: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl BrokerConfig {
    /// Creates a broker configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mirror URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Sets the contract tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Whether any mirror is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Replay settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Bound on each real call during replay, in seconds. Unbounded if unset.
    #[serde(default)]
    pub call_timeout_seconds: Option<f64>,
}

impl ReplayConfig {
    /// Bounds each real call.
    #[must_use]
    pub fn with_call_timeout(mut self, seconds: f64) -> Self {
        self.call_timeout_seconds = Some(seconds);
        self
    }

    /// Gets the call timeout as Duration.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_seconds.map(Duration::from_secs_f64)
    }
}

/// Settings of one consumer or provider run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Consumer name. Falls back to the contract's own when empty.
    #[serde(default)]
    pub consumer: String,
    /// Provider name. Falls back to the contract's own when empty.
    #[serde(default)]
    pub provider: String,
    /// Where a consumer writes the contract it computed.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    /// Broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Assertion options.
    #[serde(default)]
    pub assert_opts: AssertOpts,
    /// Replay settings.
    #[serde(default)]
    pub replay: ReplayConfig,
}

impl CollectorConfig {
    /// Creates a configuration for a consumer/provider pair.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Sets the contract output file.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Sets the broker settings.
    #[must_use]
    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }

    /// Sets the assertion options.
    #[must_use]
    pub fn with_assert_opts(mut self, opts: AssertOpts) -> Self {
        self.assert_opts = opts;
        self
    }

    /// Sets the replay settings.
    #[must_use]
    pub fn with_replay(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }
}
