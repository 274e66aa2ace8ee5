//! Session configuration
//!
//! Loaded from YAML, then optionally overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SHARE_URL` | `share_url` |
//! | `SHARE_MAX_PAGE_LOAD_MS` | `max_page_load_time_ms` |
//! | `SHARE_DEFAULT_WAIT_MS` | `default_wait_time_ms` |
//! | `SHARE_POLL_INTERVAL_MS` | `poll_interval_ms` |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::render::{DEFAULT_MAX_PAGE_LOAD_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::result::{ShareError, ShareResult};

/// Default wait used by boolean visibility checks (3 seconds)
pub const DEFAULT_WAIT_TIME_MS: u64 = 3_000;

/// Configuration shared by every page object in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Base URL of the Share application
    pub share_url: String,
    /// Deadline used by `render()` when none is given
    pub max_page_load_time_ms: u64,
    /// Wait used by "is the dialog still open" checks
    pub default_wait_time_ms: u64,
    /// Delay between polls
    pub poll_interval_ms: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            share_url: "http://localhost:8080/share".to_string(),
            max_page_load_time_ms: DEFAULT_MAX_PAGE_LOAD_MS,
            default_wait_time_ms: DEFAULT_WAIT_TIME_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ShareConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Share base URL
    #[must_use]
    pub fn with_share_url(mut self, url: impl Into<String>) -> Self {
        self.share_url = url.into();
        self
    }

    /// Set the maximum page load time
    #[must_use]
    pub const fn with_max_page_load_time(mut self, ms: u64) -> Self {
        self.max_page_load_time_ms = ms;
        self
    }

    /// Set the default wait time
    #[must_use]
    pub const fn with_default_wait_time(mut self, ms: u64) -> Self {
        self.default_wait_time_ms = ms;
        self
    }

    /// Set the poll interval; zero is raised to 1ms
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = if ms == 0 { 1 } else { ms };
        self
    }

    /// Maximum page load time as Duration
    #[must_use]
    pub const fn max_page_load_time(&self) -> Duration {
        Duration::from_millis(self.max_page_load_time_ms)
    }

    /// Default wait time as Duration
    #[must_use]
    pub const fn default_wait_time(&self) -> Duration {
        Duration::from_millis(self.default_wait_time_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> ShareResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ShareResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `SHARE_*` environment overrides
    pub fn with_env_overrides(self) -> ShareResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ShareResult<Self> {
        if let Some(url) = lookup("SHARE_URL") {
            self.share_url = url;
        }
        let millis = |key: &str, current: u64| -> ShareResult<u64> {
            lookup(key).map_or(Ok(current), |raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ShareError::config(format!("{key} is not a number: {raw:?}")))
            })
        };
        self.max_page_load_time_ms = millis("SHARE_MAX_PAGE_LOAD_MS", self.max_page_load_time_ms)?;
        self.default_wait_time_ms = millis("SHARE_DEFAULT_WAIT_MS", self.default_wait_time_ms)?;
        self.poll_interval_ms = millis("SHARE_POLL_INTERVAL_MS", self.poll_interval_ms)?;
        self.validate()
    }

    fn validate(self) -> ShareResult<Self> {
        if self.poll_interval_ms == 0 {
            return Err(ShareError::config("poll_interval_ms must be positive"));
        }
        Ok(self)
    }
}
