//! Config validation CLI tool
//!
//! Validates a harukid configuration file and reports any errors.

use clap::Parser;
use haruki_config::{ConfigError, ServiceEndpoint, CURRENT_CONFIG_VERSION};
use haruki_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

/// Validate a harukid configuration file
#[derive(Parser, Debug)]
#[command(name = "validate-config", version)]
struct Args {
    /// Configuration file (default: $HARUKI_CONFIG or ~/.config/harukid/config.toml)
    config: Option<PathBuf>,

    /// Ignore JELLYSEERR_*, SONARR_*, RADARR_*, TAUTULLI_* and WEBHOOK_* overrides
    #[arg(long)]
    no_env: bool,
}

fn describe(endpoint: &Option<ServiceEndpoint>) -> String {
    match endpoint {
        Some(e) => e.url.clone(),
        None => "not configured".to_string(),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(default_config_path);

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    let result = if args.no_env {
        std::fs::read_to_string(&config_path)
            .map_err(ConfigError::from)
            .and_then(|content| haruki_config::parse_config(&content))
    } else {
        haruki_config::load_config(&config_path)
    };

    match result {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", settings.service.socket_path.display());
            println!("  Catalog: {}", describe(&settings.catalog));
            println!("  Series: {}", describe(&settings.series));
            println!("  Movies: {}", describe(&settings.movies));
            println!("  Activity: {}", describe(&settings.activity));
            println!(
                "  Session TTL: {}s, page size {}, release cap {}",
                settings.wizard.session_ttl.as_secs(),
                settings.wizard.page_size,
                settings.wizard.release_cap
            );
            match &settings.webhook {
                Some(webhook) => println!(
                    "  Webhook: {}{} (auth {})",
                    webhook.listen,
                    webhook.path,
                    if webhook.auth_token.is_some() { "on" } else { "off" }
                ),
                None => println!("  Webhook: disabled"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
