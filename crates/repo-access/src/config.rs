//! Configuration types for repo-access.
//!
//! Pool timing and logging settings, with loaders for config files
//! ([`file`]) and environment overrides ([`env`]).

pub mod env;
pub mod file;

use std::time::Duration;

pub use env::EnvConfig;
pub use file::{ConfigFormat, load_config, parse_config};

/// How often the background task sweeps the pool for idle connections.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(10);

/// How long a connection without sessions may stay idle before eviction.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Session pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Interval between background eviction sweeps.
    pub purge_interval: Duration,
    /// Idle time after which a connection without sessions is evicted.
    pub idle_timeout: Duration,
    /// Handshake timeout applied when a host config does not set one.
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            purge_interval: DEFAULT_PURGE_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Create a new pool config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the eviction sweep interval.
    #[must_use]
    pub const fn purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the default connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse a format name (`pretty`/`text` or `json`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `repo_access=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the log format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Everything a runtime needs: pool and logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Pool settings.
    pub pool: PoolConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Apply overrides from the environment.
    ///
    /// Unset or unparsable variables leave the current value in place.
    #[must_use]
    pub fn with_env(mut self, source: &EnvConfig) -> Self {
        use self::env::vars;

        if let Some(interval) = source.duration_secs(vars::PURGE_INTERVAL_SECS) {
            self.pool.purge_interval = interval;
        }
        if let Some(timeout) = source.duration_secs(vars::IDLE_TIMEOUT_SECS) {
            self.pool.idle_timeout = timeout;
        }
        if let Some(timeout) = source.duration_millis(vars::CONNECT_TIMEOUT_MS) {
            self.pool.connect_timeout = timeout;
        }
        if let Some(level) = source.get(vars::LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(format) = source
            .get(vars::LOG_FORMAT)
            .and_then(|name| LogFormat::from_name(&name))
        {
            self.logging.format = format;
        }
        self
    }
}
