//! Default locations, all user-writable
//!
//! - socket: `$HARUKI_SOCKET`, else `$XDG_RUNTIME_DIR/harukid/harukid.sock`,
//!   else `/tmp/harukid-$USER/harukid.sock`
//! - config: `$HARUKI_CONFIG`, else `$XDG_CONFIG_HOME/harukid/config.toml`,
//!   else `~/.config/harukid/config.toml`, else `/etc/harukid/config.toml`

use std::env;
use std::path::PathBuf;

pub const HARUKI_SOCKET_ENV: &str = "HARUKI_SOCKET";
pub const HARUKI_CONFIG_ENV: &str = "HARUKI_CONFIG";

const APP_DIR: &str = "harukid";

fn var_path(name: &str) -> Option<PathBuf> {
    env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

pub fn default_socket_path() -> PathBuf {
    var_path(HARUKI_SOCKET_ENV).unwrap_or_else(socket_path_without_env)
}

/// Socket location ignoring `$HARUKI_SOCKET`
pub fn socket_path_without_env() -> PathBuf {
    let dir = match var_path("XDG_RUNTIME_DIR") {
        Some(runtime) => runtime.join(APP_DIR),
        None => {
            let user = env::var("USER").unwrap_or_else(|_| "unknown".into());
            PathBuf::from(format!("/tmp/{}-{}", APP_DIR, user))
        }
    };
    dir.join("harukid.sock")
}

pub fn default_config_path() -> PathBuf {
    if let Some(path) = var_path(HARUKI_CONFIG_ENV) {
        return path;
    }
    let dir = var_path("XDG_CONFIG_HOME")
        .or_else(|| var_path("HOME").map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("/etc"));
    dir.join(APP_DIR).join("config.toml")
}
