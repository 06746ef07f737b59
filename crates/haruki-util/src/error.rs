//! Error types for harukid

use thiserror::Error;

use crate::OwnerKey;

/// Core error type for harukid operations
#[derive(Debug, Error)]
pub enum HarukiError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Invalid value for {component}: {value}")]
    InvalidValue { component: String, value: String },

    #[error("No live session for {0}")]
    NoSession(OwnerKey),

    #[error("Collaborator not configured: {0}")]
    NotConfigured(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarukiError {
    pub fn unknown_component(id: impl Into<String>) -> Self {
        Self::UnknownComponent(id.into())
    }

    pub fn invalid_value(component: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            component: component.into(),
            value: value.into(),
        }
    }

    pub fn not_configured(what: impl Into<String>) -> Self {
        Self::NotConfigured(what.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HarukiError>;
