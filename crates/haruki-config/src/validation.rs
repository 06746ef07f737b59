//! Configuration validation

use crate::schema::{RawConfig, RawEndpoint, RawWebhookConfig};
use std::net::SocketAddr;
use thiserror::Error;

/// Largest page a chat select can hold
pub const MAX_PAGE_SIZE: usize = 25;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {message}")]
    EndpointError { section: String, message: String },

    #[error("[wizard] {field} {message}")]
    WizardError { field: String, message: String },

    #[error("[webhook] {0}")]
    WebhookError(String),
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (section, endpoint) in [
        ("catalog", &config.catalog),
        ("series", &config.series),
        ("movies", &config.movies),
        ("activity", &config.activity),
    ] {
        if let Some(endpoint) = endpoint {
            errors.extend(validate_endpoint(section, endpoint));
        }
    }

    let wizard = &config.wizard;
    if let Some(size) = wizard.page_size
        && !(1..=MAX_PAGE_SIZE).contains(&size)
    {
        errors.push(ValidationError::WizardError {
            field: "page_size".into(),
            message: format!("must be between 1 and {}", MAX_PAGE_SIZE),
        });
    }
    if let Some(cap) = wizard.release_cap
        && !(1..=MAX_PAGE_SIZE).contains(&cap)
    {
        errors.push(ValidationError::WizardError {
            field: "release_cap".into(),
            message: format!("must be between 1 and {}", MAX_PAGE_SIZE),
        });
    }
    for (field, value) in [
        ("session_ttl_seconds", wizard.session_ttl_seconds),
        ("search_timeout_seconds", wizard.search_timeout_seconds),
        ("release_timeout_seconds", wizard.release_timeout_seconds),
        ("http_timeout_seconds", wizard.http_timeout_seconds),
    ] {
        if value == Some(0) {
            errors.push(ValidationError::WizardError {
                field: field.into(),
                message: "must be greater than zero".into(),
            });
        }
    }
    for (field, value) in [
        ("required_role", &wizard.required_role),
        ("privileged_role", &wizard.privileged_role),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(ValidationError::WizardError {
                field: field.into(),
                message: "cannot be blank".into(),
            });
        }
    }

    if let Some(webhook) = &config.webhook {
        errors.extend(validate_webhook(webhook));
    }

    errors
}

fn validate_endpoint(section: &str, endpoint: &RawEndpoint) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let error = |message: &str| ValidationError::EndpointError {
        section: section.to_string(),
        message: message.to_string(),
    };

    match endpoint.url.as_deref().map(str::trim) {
        None | Some("") => errors.push(error("url is required")),
        Some(url) if !is_http_url(url) => errors.push(error("url must start with http:// or https://")),
        Some(_) => {}
    }

    if endpoint
        .api_key
        .as_deref()
        .is_none_or(|key| key.trim().is_empty())
    {
        errors.push(error("api_key cannot be empty"));
    }

    errors
}

fn validate_webhook(webhook: &RawWebhookConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(listen) = &webhook.listen
        && let Err(e) = parse_listen_addr(listen)
    {
        errors.push(ValidationError::WebhookError(e));
    }

    if let Some(path) = &webhook.path
        && !path.starts_with('/')
    {
        errors.push(ValidationError::WebhookError(format!(
            "path '{}' must start with '/'",
            path
        )));
    }

    if webhook.dedup_window_seconds == Some(0) {
        errors.push(ValidationError::WebhookError(
            "dedup_window_seconds must be greater than zero".into(),
        ));
    }

    errors
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parse a listen address; a bare ":port" binds every interface
pub fn parse_listen_addr(s: &str) -> Result<SocketAddr, String> {
    let s = s.trim();
    let full = if s.starts_with(':') {
        format!("0.0.0.0{}", s)
    } else {
        s.to_string()
    };
    full.parse()
        .map_err(|_| format!("invalid listen address '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawWizardConfig;

    fn endpoint(url: &str, key: &str) -> Option<RawEndpoint> {
        Some(RawEndpoint {
            url: Some(url.into()),
            api_key: Some(key.into()),
        })
    }

    #[test]
    fn listen_addr_forms() {
        assert_eq!(parse_listen_addr(":8080").unwrap().port(), 8080);
        assert!(parse_listen_addr(":8080").unwrap().ip().is_unspecified());
        assert_eq!(
            parse_listen_addr("127.0.0.1:9000").unwrap().to_string(),
            "127.0.0.1:9000"
        );
        assert!(parse_listen_addr("localhost").is_err());
    }

    #[test]
    fn endpoint_rules() {
        let config = RawConfig {
            config_version: 1,
            catalog: endpoint("localhost:5055", "k"),
            series: endpoint("http://sonarr", " "),
            movies: Some(RawEndpoint::default()),
            ..Default::default()
        };

        let errors = validate_config(&config);
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(rendered.contains(&"[catalog] url must start with http:// or https://".to_string()));
        assert!(rendered.contains(&"[series] api_key cannot be empty".to_string()));
        assert!(rendered.contains(&"[movies] url is required".to_string()));
        assert!(rendered.contains(&"[movies] api_key cannot be empty".to_string()));
    }

    #[test]
    fn wizard_rules_collect_every_error() {
        let config = RawConfig {
            config_version: 1,
            wizard: RawWizardConfig {
                page_size: Some(30),
                release_cap: Some(0),
                session_ttl_seconds: Some(0),
                release_timeout_seconds: Some(0),
                required_role: Some("  ".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::WizardError { .. })));
    }

    #[test]
    fn webhook_rules() {
        let config = RawConfig {
            config_version: 1,
            webhook: Some(RawWebhookConfig {
                listen: Some("nope".into()),
                path: Some("webhook".into()),
                dedup_window_seconds: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(validate_config(&config).len(), 3);
    }

    #[test]
    fn valid_config_has_no_errors() {
        let config = RawConfig {
            config_version: 1,
            catalog: endpoint("https://requests.example.org", "key"),
            ..Default::default()
        };
        assert!(validate_config(&config).is_empty());
    }
}
