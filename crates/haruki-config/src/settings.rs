//! Validated settings structures

use crate::schema::{RawConfig, RawEndpoint, RawServiceConfig, RawWebhookConfig, RawWizardConfig};
use crate::validation::parse_listen_addr;
use haruki_util::default_socket_path;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceSettings,

    /// `None` when the section is absent
    pub catalog: Option<ServiceEndpoint>,
    pub series: Option<ServiceEndpoint>,
    pub movies: Option<ServiceEndpoint>,
    pub activity: Option<ServiceEndpoint>,

    pub wizard: WizardSettings,

    /// `None` unless a listen address is configured
    pub webhook: Option<WebhookSettings>,

    /// Notification channel used when a payload names none. Kept outside
    /// `webhook` so a relay fed by other means still has a target.
    pub default_channel: Option<String>,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let default_channel = raw
            .webhook
            .as_ref()
            .and_then(|w| w.default_channel.clone())
            .filter(|c| !c.trim().is_empty());

        Self {
            service: ServiceSettings::from_raw(raw.service),
            catalog: raw.catalog.and_then(ServiceEndpoint::from_raw),
            series: raw.series.and_then(ServiceEndpoint::from_raw),
            movies: raw.movies.and_then(ServiceEndpoint::from_raw),
            activity: raw.activity.and_then(ServiceEndpoint::from_raw),
            wizard: WizardSettings::from_raw(raw.wizard),
            webhook: raw.webhook.and_then(WebhookSettings::from_raw),
            default_channel,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            ..Default::default()
        })
    }
}

/// Daemon settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub socket_path: PathBuf,
    pub log_level: String,
}

impl ServiceSettings {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            log_level: raw.log_level.unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// A configured remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Base URL without a trailing slash
    pub url: String,
    pub api_key: String,
}

impl ServiceEndpoint {
    fn from_raw(raw: RawEndpoint) -> Option<Self> {
        Some(Self {
            url: raw.url?.trim().trim_end_matches('/').to_string(),
            api_key: raw.api_key?.trim().to_string(),
        })
    }
}

/// Wizard tuning
#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub session_ttl: Duration,
    pub page_size: usize,
    pub release_cap: usize,
    pub search_timeout: Duration,
    pub release_timeout: Duration,
    pub http_timeout: Duration,
    pub required_role: Option<String>,
    pub privileged_role: Option<String>,
}

impl WizardSettings {
    fn from_raw(raw: RawWizardConfig) -> Self {
        Self {
            session_ttl: Duration::from_secs(raw.session_ttl_seconds.unwrap_or(180)),
            page_size: raw.page_size.unwrap_or(25),
            release_cap: raw.release_cap.unwrap_or(25),
            search_timeout: Duration::from_secs(raw.search_timeout_seconds.unwrap_or(60)),
            release_timeout: Duration::from_secs(raw.release_timeout_seconds.unwrap_or(60)),
            http_timeout: Duration::from_secs(raw.http_timeout_seconds.unwrap_or(60)),
            required_role: raw.required_role,
            privileged_role: raw.privileged_role,
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from_raw(RawWizardConfig::default())
    }
}

/// Webhook listener settings
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub listen: SocketAddr,
    pub path: String,
    pub auth_token: Option<String>,
    pub dedup_window: Duration,
}

impl WebhookSettings {
    fn from_raw(raw: RawWebhookConfig) -> Option<Self> {
        let listen = parse_listen_addr(raw.listen.as_deref()?).ok()?;
        Some(Self {
            listen,
            path: raw.path.unwrap_or_else(|| "/webhook".to_string()),
            auth_token: raw.auth_token.filter(|t| !t.is_empty()),
            dedup_window: Duration::from_secs(raw.dedup_window_seconds.unwrap_or(30)),
        })
    }
}
