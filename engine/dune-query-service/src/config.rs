use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DuneQueryError, Result};

/// Optional configuration file read from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dune-query.toml";

/// Environment prefix for overrides, e.g. `DUNE_QUERY__DUNE__BASE_URL`
pub const ENV_PREFIX: &str = "DUNE_QUERY";

/// Legacy API key variable consulted when `api_key_env` is unset
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Configuration for the Dune query service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Dune API configuration
    pub dune: DuneApiConfig,

    /// CSV export configuration
    pub export: ExportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuneApiConfig {
    /// API key environment variable name
    pub api_key_env: String,

    /// Dune API base URL
    pub base_url: String,

    /// Upper bound for a full query execution, in seconds
    pub request_timeout_secs: u64,

    /// Interval between execution status polls, in seconds
    pub ping_frequency_secs: u64,

    /// Execution tier ("medium" or "large")
    pub performance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory that default `<query_name>.csv` exports land in
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for DuneApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "DUNE_API_KEY".to_string(),
            base_url: "https://api.dune.com".to_string(),
            request_timeout_secs: 300,
            ping_frequency_secs: 5,
            performance: "medium".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `.env`, the default config file and environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::load(Some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Layer defaults, an optional TOML file and `DUNE_QUERY__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: ServiceConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DuneQueryError::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(DuneQueryError::config(format!(
                    "Invalid log level: {}",
                    other
                )))
            }
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(DuneQueryError::config(format!(
                    "Invalid log format: {}",
                    other
                )))
            }
        }

        if self.dune.request_timeout_secs == 0 {
            return Err(DuneQueryError::config("request_timeout_secs must be positive"));
        }

        if self.dune.ping_frequency_secs == 0 {
            return Err(DuneQueryError::config("ping_frequency_secs must be positive"));
        }

        if self.dune.base_url.is_empty() {
            return Err(DuneQueryError::config("base_url must not be empty"));
        }

        Ok(())
    }
}

impl ExportConfig {
    /// Path a query exports to when the caller gives none
    pub fn default_export_path(&self, query_name: &str) -> PathBuf {
        self.export_dir.join(format!("{}.csv", query_name))
    }
}

impl DuneApiConfig {
    /// Get the Dune API key from environment
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV))
            .map_err(|_| {
                DuneQueryError::config(format!(
                    "Dune API key not found in environment ({} or {})",
                    self.api_key_env, FALLBACK_API_KEY_ENV
                ))
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ping_frequency(&self) -> Duration {
        Duration::from_secs(self.ping_frequency_secs)
    }
}
