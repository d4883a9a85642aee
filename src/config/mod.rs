//! Configuration management for feedtide.
//!
//! Configuration is read from `~/.config/feedtide/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod interval;

pub use interval::{format_interval, parse_interval};

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub aggregator: AggregatorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means `<data_dir>/feedtide/feedtide.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Time between scheduler ticks, e.g. "1m" or "1h30m".
    pub interval: String,
    /// Sent as the `User-Agent` header on every feed request.
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

pub const DEFAULT_INTERVAL: &str = "1m";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("feedtide/", env!("CARGO_PKG_VERSION"));

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AggregatorConfig {
    pub fn request_timeout(&self) -> crate::app::Result<Duration> {
        if self.request_timeout_secs == 0 {
            return Err(crate::app::FeedtideError::Config(
                "aggregator.request_timeout_secs must be positive".into(),
            ));
        }
        Ok(Duration::from_secs(self.request_timeout_secs))
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedtide/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedtide").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        format!(
            r##"# feedtide configuration

[database]
# SQLite database file. Defaults to <data dir>/feedtide/feedtide.db
# path = "/var/lib/feedtide/feedtide.db"

[aggregator]
# Time between polls. One feed (the least recently fetched) is
# collected per tick. Examples: "30s", "1m", "1h30m"
interval = "{interval}"

# User-Agent header sent with every feed request
user_agent = "{user_agent}"

# Give up on a single feed request after this many seconds
request_timeout_secs = {timeout}
"##,
            interval = DEFAULT_INTERVAL,
            user_agent = DEFAULT_USER_AGENT,
            timeout = DEFAULT_REQUEST_TIMEOUT_SECS,
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
