//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`COCO_*`)
//! 3. TOML configuration file
//! 4. Compiled defaults (fallback)
//!
//! This module owns tiers 3 and 4 plus the environment helpers. The final merge
//! with command-line overrides happens in the consuming crate.
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "COCO_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Import endpoint URL (preview and commit share it)
    #[serde(default)]
    pub import_endpoint: Option<String>,

    /// Inclusive lower bound of the HTTP success range
    #[serde(default)]
    pub success_status_min: Option<u16>,

    /// Exclusive upper bound of the HTTP success range
    #[serde(default)]
    pub success_status_max: Option<u16>,

    /// Image shown when a record has no asset or the asset fails to load
    #[serde(default)]
    pub placeholder_asset_url: Option<String>,

    /// Page size used when re-fetching the authoritative list
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Auto-dismiss timer for notices, in milliseconds
    #[serde(default)]
    pub alert_timeout_ms: Option<u64>,

    /// Listing endpoint used for the post-commit re-fetch
    #[serde(default)]
    pub listing_endpoint: Option<String>,

    /// HTTP request timeout, in milliseconds
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Local port for the asset URL server (0 = ephemeral)
    #[serde(default)]
    pub asset_server_port: Option<u16>,

    /// Path to a translation catalog (TOML `[messages]` table)
    #[serde(default)]
    pub translations: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults, used when no other tier supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub import_endpoint: String,
    pub success_status_min: u16,
    pub success_status_max: u16,
    pub placeholder_asset_url: String,
    pub page_size: u32,
    pub alert_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub asset_server_port: u16,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            import_endpoint: "http://127.0.0.1:8000/api/import/".to_string(),
            success_status_min: 200,
            success_status_max: 300,
            placeholder_asset_url: "/images/placeholder.png".to_string(),
            page_size: 10,
            alert_timeout_ms: 5000,
            request_timeout_ms: 30_000,
            asset_server_port: 0,
            log_level: default_log_level(),
        }
    }
}

/// Locate the TOML config file
///
/// Priority: explicit path → `COCO_CONFIG` → `<config dir>/coco/import.toml`.
/// Returns `None` when no candidate can be determined.
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_string(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("coco").join("import.toml"))
}

/// Load the TOML config file, degrading to defaults when it does not exist
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config file location available, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Read a non-empty environment variable
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
///
/// Unset or empty variables yield `Ok(None)`; unparsable values are a
/// configuration error rather than being silently ignored.
pub fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {} ({})", name, raw, e))),
    }
}
