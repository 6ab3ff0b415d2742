//! File-based configuration loading.
//!
//! Every key is optional; missing keys keep their defaults.
//!
//! ```toml
//! [pool]
//! purge_interval_secs = 10
//! idle_timeout_secs = 600
//! connect_timeout_ms = 30000
//!
//! [logging]
//! level = "repo_access=debug"
//! format = "json"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::{LogFormat, RuntimeConfig};
use crate::error::{AccessError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    pool: PoolSection,
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PoolSection {
    purge_interval_secs: Option<u64>,
    idle_timeout_secs: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
}

impl FileConfig {
    fn apply(self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        let pool = self.pool;
        if let Some(secs) = pool.purge_interval_secs {
            if secs == 0 {
                return Err(AccessError::config("pool.purge_interval_secs must be positive"));
            }
            config.pool.purge_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = pool.idle_timeout_secs {
            config.pool.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = pool.connect_timeout_ms {
            config.pool.connect_timeout = Duration::from_millis(ms);
        }

        let logging = self.logging;
        if let Some(level) = logging.level {
            config.logging.level = level;
        }
        if let Some(name) = logging.format {
            config.logging.format = LogFormat::from_name(&name)
                .ok_or_else(|| AccessError::config(format!("unknown log format: {name}")))?;
        }
        Ok(config)
    }
}

/// Parse config content on top of the defaults.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RuntimeConfig> {
    let file: FileConfig = match format {
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| AccessError::config(format!("invalid TOML config: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| AccessError::config(format!("invalid JSON config: {e}")))?,
    };
    file.apply(RuntimeConfig::default())
}

/// Load a config file, detecting its format from the extension.
pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        AccessError::config(format!("unknown config format: {}", path.display()))
    })?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| AccessError::io_context(format!("reading {}", path.display()), e))?;
    parse_config(&content, format)
}
