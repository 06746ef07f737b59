//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Media catalog (search and requests)
    pub catalog: Option<RawEndpoint>,

    /// Series acquisition service
    pub series: Option<RawEndpoint>,

    /// Movie acquisition service
    pub movies: Option<RawEndpoint>,

    /// Playback activity monitor
    pub activity: Option<RawEndpoint>,

    /// Wizard tuning
    #[serde(default)]
    pub wizard: RawWizardConfig,

    /// Inbound notification listener
    pub webhook: Option<RawWebhookConfig>,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/harukid/harukid.sock)
    pub socket_path: Option<PathBuf>,

    /// Default tracing directive, e.g. "info" or "haruki_core=debug"
    pub log_level: Option<String>,
}

/// A remote service reachable over HTTP
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEndpoint {
    /// Base URL, e.g. "http://localhost:5055"
    pub url: Option<String>,

    /// Sent as `X-Api-Key` (the activity monitor takes it as `apikey`)
    pub api_key: Option<String>,
}

/// Wizard tuning; every value has a default
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWizardConfig {
    /// Idle time before a session expires
    pub session_ttl_seconds: Option<u64>,

    /// Options per list page
    pub page_size: Option<usize>,

    /// Maximum selectable releases
    pub release_cap: Option<usize>,

    /// Deadline for catalog search and detail calls
    pub search_timeout_seconds: Option<u64>,

    /// Deadline for release lookups
    pub release_timeout_seconds: Option<u64>,

    /// Per-request timeout of the HTTP client
    pub http_timeout_seconds: Option<u64>,

    /// Role needed to start the request wizard
    pub required_role: Option<String>,

    /// Role allowed to abort other people's sessions
    pub privileged_role: Option<String>,
}

/// Webhook listener settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWebhookConfig {
    /// Listen address; ":8080" binds all interfaces
    pub listen: Option<String>,

    /// Route path (default: /webhook)
    pub path: Option<String>,

    /// Expected `Authorization` header value, with or without `Bearer `
    pub auth_token: Option<String>,

    /// Channel for notifications that do not name one
    pub default_channel: Option<String>,

    /// Duplicate suppression window
    pub dedup_window_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [service]
            log_level = "debug"

            [catalog]
            url = "http://localhost:5055"
            api_key = "abc"

            [series]
            url = "http://localhost:8989"
            api_key = "def"

            [activity]
            url = "http://localhost:8181"
            api_key = "ghi"

            [wizard]
            session_ttl_seconds = 300
            required_role = "Plex"

            [webhook]
            listen = ":8080"
            default_channel = "123"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.log_level.as_deref(), Some("debug"));
        assert_eq!(config.catalog.unwrap().api_key.as_deref(), Some("abc"));
        assert!(config.movies.is_none());
        assert_eq!(config.activity.unwrap().url.as_deref(), Some("http://localhost:8181"));
        assert_eq!(config.wizard.session_ttl_seconds, Some(300));
        assert_eq!(config.webhook.unwrap().listen.as_deref(), Some(":8080"));
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.catalog.is_none());
        assert!(config.webhook.is_none());
        assert!(config.wizard.page_size.is_none());
    }
}
