//! Configuration parsing and validation for harukid
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Optional remote service sections (absent means not configured)
//! - Wizard tuning and the webhook listener
//! - Environment overrides for deployment secrets
//! - Validation with clear error messages

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file, applying overrides
/// from the process environment
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_config_with_env(&content, |key| std::env::var(key).ok())
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Settings> {
    parse_config_with_env(content, |_| None)
}

/// Parse, apply overrides from `lookup`, then validate
pub fn parse_config_with_env(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<Settings> {
    let mut raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    apply_env_overrides(&mut raw, lookup);

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Settings::from_raw(raw))
}

/// Overwrite config values with non-empty environment variables.
///
/// A variable for a missing section creates that section.
pub fn apply_env_overrides(raw: &mut RawConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    for (section, url_key, api_key_key) in [
        (&mut raw.catalog, "JELLYSEERR_URL", "JELLYSEERR_API_KEY"),
        (&mut raw.series, "SONARR_URL", "SONARR_API_KEY"),
        (&mut raw.movies, "RADARR_URL", "RADARR_API_KEY"),
        (&mut raw.activity, "TAUTULLI_URL", "TAUTULLI_API_KEY"),
    ] {
        if let Some(url) = get(url_key) {
            debug!(key = url_key, "Applying environment override");
            section.get_or_insert_with(Default::default).url = Some(url);
        }
        if let Some(key) = get(api_key_key) {
            debug!(key = api_key_key, "Applying environment override");
            section.get_or_insert_with(Default::default).api_key = Some(key);
        }
    }

    if let Some(listen) = get("WEBHOOK_ADDR") {
        webhook_section(raw).listen = Some(listen);
    }
    if let Some(path) = get("WEBHOOK_PATH") {
        webhook_section(raw).path = Some(path);
    }
    if let Some(token) = get("WEBHOOK_AUTH_TOKEN") {
        webhook_section(raw).auth_token = Some(token);
    }
    if let Some(channel) = get("DISCORD_CHANNEL_ID") {
        webhook_section(raw).default_channel = Some(channel);
    }
}

fn webhook_section(raw: &mut RawConfig) -> &mut RawWebhookConfig {
    raw.webhook.get_or_insert_with(Default::default)
}
