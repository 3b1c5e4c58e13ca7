//! Resolved configuration for coco-import
//!
//! Every setting is resolved independently with the priority
//! CLI → `COCO_*` environment → TOML file → compiled default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coco_common::config::{
    config_file_path, env_parse, env_string, load_toml_config, CompiledDefaults, TomlConfig,
};
use tracing::info;

use crate::services::SuccessRange;
use crate::{Error, Result};

pub const ENV_IMPORT_ENDPOINT: &str = "COCO_IMPORT_ENDPOINT";
pub const ENV_SUCCESS_START: &str = "COCO_HTTP_SUCCESS_START";
pub const ENV_SUCCESS_END: &str = "COCO_HTTP_SUCCESS_END";
pub const ENV_PLACEHOLDER_URL: &str = "COCO_PLACEHOLDER_ASSET_URL";
pub const ENV_PAGE_SIZE: &str = "COCO_PAGE_SIZE";
pub const ENV_ALERT_TIMEOUT_MS: &str = "COCO_ALERT_TIMEOUT_MS";
pub const ENV_LISTING_ENDPOINT: &str = "COCO_LISTING_ENDPOINT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "COCO_REQUEST_TIMEOUT_MS";
pub const ENV_ASSET_SERVER_PORT: &str = "COCO_ASSET_SERVER_PORT";
pub const ENV_TRANSLATIONS: &str = "COCO_TRANSLATIONS";

/// Command-line values that take precedence over everything else
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub import_endpoint: Option<String>,
    pub listing_endpoint: Option<String>,
    pub page_size: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    pub import_endpoint: String,
    pub success_range: SuccessRange,
    pub placeholder_asset_url: String,
    pub page_size: u32,
    pub alert_timeout: Duration,
    pub listing_endpoint: Option<String>,
    pub request_timeout: Duration,
    pub asset_server_port: u16,
    pub translations: Option<PathBuf>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl ImportConfig {
    /// Locate and read the TOML file, then resolve every setting
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let path = config_file_path(overrides.config_path.as_deref());
        let toml = load_toml_config(path.as_deref())?;
        Self::resolve(&toml, overrides)
    }

    /// Merge the tiers for an already loaded TOML file
    pub fn resolve(toml: &TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let config = Self {
            import_endpoint: overrides
                .import_endpoint
                .clone()
                .or_else(|| env_string(ENV_IMPORT_ENDPOINT))
                .or_else(|| toml.import_endpoint.clone())
                .unwrap_or(defaults.import_endpoint),
            success_range: SuccessRange::new(
                env_parse(ENV_SUCCESS_START)?
                    .or(toml.success_status_min)
                    .unwrap_or(defaults.success_status_min),
                env_parse(ENV_SUCCESS_END)?
                    .or(toml.success_status_max)
                    .unwrap_or(defaults.success_status_max),
            ),
            placeholder_asset_url: env_string(ENV_PLACEHOLDER_URL)
                .or_else(|| toml.placeholder_asset_url.clone())
                .unwrap_or(defaults.placeholder_asset_url),
            page_size: match overrides.page_size {
                Some(size) => size,
                None => env_parse(ENV_PAGE_SIZE)?
                    .or(toml.page_size)
                    .unwrap_or(defaults.page_size),
            },
            alert_timeout: Duration::from_millis(
                env_parse(ENV_ALERT_TIMEOUT_MS)?
                    .or(toml.alert_timeout_ms)
                    .unwrap_or(defaults.alert_timeout_ms),
            ),
            listing_endpoint: overrides
                .listing_endpoint
                .clone()
                .or_else(|| env_string(ENV_LISTING_ENDPOINT))
                .or_else(|| toml.listing_endpoint.clone()),
            request_timeout: Duration::from_millis(
                env_parse(ENV_REQUEST_TIMEOUT_MS)?
                    .or(toml.request_timeout_ms)
                    .unwrap_or(defaults.request_timeout_ms),
            ),
            asset_server_port: env_parse(ENV_ASSET_SERVER_PORT)?
                .or(toml.asset_server_port)
                .unwrap_or(defaults.asset_server_port),
            translations: env_string(ENV_TRANSLATIONS)
                .map(PathBuf::from)
                .or_else(|| toml.translations.clone()),
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            log_file: toml.logging.file.clone(),
        };

        config.validate()?;

        info!(
            endpoint = %config.import_endpoint,
            success_min = config.success_range.min,
            success_max = config.success_range.max,
            page_size = config.page_size,
            "Resolved import configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.import_endpoint.trim().is_empty() {
            return Err(Error::Config("import endpoint must not be empty".to_string()));
        }
        if self.success_range.min >= self.success_range.max {
            return Err(Error::Config(format!(
                "success status range is empty: [{}, {})",
                self.success_range.min, self.success_range.max
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page size must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn translations_path(&self) -> Option<&Path> {
        self.translations.as_deref()
    }
}
