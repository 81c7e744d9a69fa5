//! Server configuration loading from file and environment variables.

use courier_db::{database_path_from_url, DbRuntimeSettings, PoolError};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite://data/courier.db`.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Filesystem path named by `url`.
    pub fn path(&self) -> Result<String, PoolError> {
        database_path_from_url(&self.url)
    }

    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "courier_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_database_url() -> String {
    "sqlite://courier.db".to_string()
}

fn default_pool_max_size() -> u32 {
    DbRuntimeSettings::default().pool_max_size
}

fn default_busy_timeout_ms() -> u64 {
    DbRuntimeSettings::default().busy_timeout_ms
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_max_size: default_pool_max_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `COURIER_HOST` overrides `server.host`
/// - `COURIER_PORT` overrides `server.port`
/// - `DATABASE_URL` overrides `database.url`
/// - `COURIER_DB_POOL_MAX_SIZE` overrides `database.pool_max_size`
/// - `COURIER_DB_BUSY_TIMEOUT_MS` overrides `database.busy_timeout_ms`
/// - `COURIER_LOG_LEVEL` overrides `logging.level`
/// - `COURIER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// Unparseable numeric or address overrides are ignored with a warning.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

fn load_config_with(
    path: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, lookup);
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("COURIER_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid COURIER_HOST"),
        }
    }
    if let Some(port) = lookup("COURIER_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid COURIER_PORT"),
        }
    }
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(size) = lookup("COURIER_DB_POOL_MAX_SIZE") {
        match size.parse() {
            Ok(parsed) if parsed > 0 => config.database.pool_max_size = parsed,
            _ => tracing::warn!(value = %size, "ignoring invalid COURIER_DB_POOL_MAX_SIZE"),
        }
    }
    if let Some(timeout) = lookup("COURIER_DB_BUSY_TIMEOUT_MS") {
        match timeout.parse() {
            Ok(parsed) => config.database.busy_timeout_ms = parsed,
            Err(_) => {
                tracing::warn!(value = %timeout, "ignoring invalid COURIER_DB_BUSY_TIMEOUT_MS")
            }
        }
    }
    if let Some(level) = lookup("COURIER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("COURIER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
