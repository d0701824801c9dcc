//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

use crate::service::DEFAULT_FANOUT_CONCURRENCY;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub timeline: TimelineConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile in-process store
    #[default]
    Memory,
    /// SQLite file
    Sqlite,
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Path to SQLite database file (sqlite backend only)
    pub path: Option<PathBuf>,
    /// Interval between expired-tweet sweeps in seconds
    #[serde(default = "default_purge_interval_seconds")]
    pub purge_interval_seconds: u64,
}

fn default_purge_interval_seconds() -> u64 {
    3600
}

/// Timeline fan-out configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Follower timeline writes in flight per tweet (1 = sequential)
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

fn default_fanout_concurrency() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("tweetline={},tower_http=debug", self.level)
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TWEETLINE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("store.backend", "memory")?
            .set_default("store.purge_interval_seconds", 3600)?
            .set_default("timeline.fanout_concurrency", DEFAULT_FANOUT_CONCURRENCY as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("TWEETLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.timeline.fanout_concurrency == 0 {
            return Err(crate::error::AppError::Config(
                "timeline.fanout_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            return Err(crate::error::AppError::Config(
                "store.path is required when store.backend=sqlite".to_string(),
            ));
        }

        if self.store.purge_interval_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "store.purge_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if tracing_subscriber::EnvFilter::try_new(self.logging.default_filter()).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "logging.level {:?} is not a valid level",
                self.logging.level
            )));
        }

        Ok(())
    }
}
