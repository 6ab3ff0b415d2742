//! Environment-based configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "REPO_ACCESS";

/// Environment variable reader.
///
/// Values registered with [`EnvConfig::with_override`] shadow the process
/// environment, which keeps tests away from global state.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Values that take precedence over the process environment.
    overrides: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: HashMap::new(),
        }
    }

    /// Create without a prefix.
    #[must_use]
    pub fn no_prefix() -> Self {
        Self::new(String::new())
    }

    /// Shadow a variable with a fixed value.
    #[must_use]
    pub fn with_override(mut self, name: &str, value: impl Into<String>) -> Self {
        let var_name = self.var_name(name);
        self.overrides.insert(var_name, value.into());
        self
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        self.overrides
            .get(&var_name)
            .cloned()
            .or_else(|| std::env::var(&var_name).ok())
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    /// Get a duration in seconds.
    #[must_use]
    pub fn duration_secs(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_secs)
    }

    /// Get a duration in milliseconds.
    #[must_use]
    pub fn duration_millis(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_millis)
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Variable names understood by [`crate::config::RuntimeConfig::with_env`].
pub mod vars {
    /// Eviction sweep interval in seconds.
    pub const PURGE_INTERVAL_SECS: &str = "PURGE_INTERVAL_SECS";
    /// Idle timeout in seconds.
    pub const IDLE_TIMEOUT_SECS: &str = "IDLE_TIMEOUT_SECS";
    /// Connect timeout in milliseconds.
    pub const CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log format (`pretty` or `json`).
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
