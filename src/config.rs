//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hub connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_hub_url")]
    pub base_url: String,

    /// Bearer token for the hub session
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_hub_timeout")]
    pub request_timeout_ms: u64,
}

fn default_hub_url() -> String {
    "http://homey.local".to_string()
}

fn default_hub_timeout() -> u64 {
    10_000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: default_hub_url(),
            token: String::new(),
            request_timeout_ms: default_hub_timeout(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Metric catalog cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Seconds a cached catalog stays valid before a rebuild
    #[serde(default = "default_catalog_ttl")]
    pub ttl_secs: u64,
}

fn default_catalog_ttl() -> u64 {
    180
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_catalog_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("hearth").join("config.toml")),
            Some(PathBuf::from("/etc/hearth/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Hub overrides
        if let Ok(url) = std::env::var("HEARTH_HUB_URL") {
            self.hub.base_url = url;
        }
        if let Ok(token) = std::env::var("HEARTH_HUB_TOKEN") {
            self.hub.token = token;
        }

        // API overrides
        if let Ok(host) = std::env::var("HEARTH_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("HEARTH_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Catalog overrides
        if let Ok(ttl) = std::env::var("HEARTH_CATALOG_TTL_SECS") {
            if let Ok(t) = ttl.parse() {
                self.catalog.ttl_secs = t;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("HEARTH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("HEARTH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            api: ApiConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hearth Configuration
#
# Environment variables override these settings:
# - HEARTH_HUB_URL
# - HEARTH_HUB_TOKEN
# - HEARTH_API_HOST
# - HEARTH_API_PORT
# - HEARTH_CATALOG_TTL_SECS
# - HEARTH_LOG_LEVEL
# - HEARTH_LOG_FORMAT

[hub]
# Base URL of the hub API
base_url = "http://homey.local"

# Bearer token for the hub session
token = ""

# Request timeout in milliseconds
request_timeout_ms = 10000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8080

[catalog]
# Seconds a cached metric catalog stays valid
ttl_secs = 180

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
