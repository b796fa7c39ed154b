// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the broker

use std::fmt;

/// Result type alias using BrokerError
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors reported by the client-facing broker operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Caller identity is not allowed to use the broker
    PermissionDenied { uid: u32 },
    /// Hardware provider refused to open the device
    DeviceUnavailable(String),
    /// The handle's backing resource has already gone away
    StaleHandle,
    /// Handle does not match the one the broker is tracking
    Mismatch,
    /// Handle is empty or unknown to the broker
    NotFound,
    /// No hardware provider is registered under this name
    ProviderNotFound(String),
    /// `init` was called a second time
    AlreadyInitialized,
    /// An operation was attempted before `init`
    NotInitialized,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::PermissionDenied { uid } => {
                write!(f, "Permission denied for uid {}", uid)
            }
            BrokerError::DeviceUnavailable(id) => write!(f, "Device unavailable: {}", id),
            BrokerError::StaleHandle => write!(f, "Handle no longer refers to a live device"),
            BrokerError::Mismatch => write!(f, "Handle is not the active one"),
            BrokerError::NotFound => write!(f, "Handle not found"),
            BrokerError::ProviderNotFound(name) => {
                write!(f, "Hardware provider not found: {}", name)
            }
            BrokerError::AlreadyInitialized => write!(f, "Broker is already initialized"),
            BrokerError::NotInitialized => write!(f, "Broker is not initialized"),
        }
    }
}

impl std::error::Error for BrokerError {}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),
    /// Config file is not valid JSON for [`crate::config::Config`]
    Parse(serde_json::Error),
    /// Config parsed but holds an unusable value
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}
