//! Bot configuration.
//!
//! Settings are loaded from environment variables. The root principal is the
//! only required value: without it the bot must not serve any command.

use std::time::Duration;
use thiserror::Error;
use warden_rbac::{Principal, RetryConfig, RoleStoreConfig};

/// Environment variable holding the root principal.
pub const ROOT_ENV: &str = "RBAC_ROLE_ROOT";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required setting.
    #[error("Missing required setting: {0}")]
    MissingConfiguration(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// RBAC bot settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Principal holding the `root` role.
    pub root_principal: Principal,

    /// Storage key prefix.
    pub key_prefix: String,

    /// Time budget for each storage call, in milliseconds.
    pub storage_timeout_ms: u64,

    /// Time budget for each alert delivery, in milliseconds.
    pub notify_timeout_ms: u64,

    /// Attempts for a role write that keeps conflicting.
    pub cas_max_attempts: u32,
}

impl Settings {
    /// Default storage key prefix.
    pub const DEFAULT_KEY_PREFIX: &'static str = "rbac";

    /// Create settings with defaults for everything but the root principal.
    pub fn new(root_principal: Principal) -> Self {
        Self {
            root_principal,
            key_prefix: Self::DEFAULT_KEY_PREFIX.to_string(),
            storage_timeout_ms: 5000,
            notify_timeout_ms: 5000,
            cas_max_attempts: RetryConfig::default().max_attempts,
        }
    }

    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `RBAC_ROLE_ROOT`: Root principal id (required)
    /// - `RBAC_KEY_PREFIX`: Storage key prefix (default: rbac)
    /// - `RBAC_STORAGE_TIMEOUT_MS`: Storage call timeout (default: 5000)
    /// - `RBAC_NOTIFY_TIMEOUT_MS`: Alert delivery timeout (default: 5000)
    /// - `RBAC_CAS_MAX_ATTEMPTS`: Conflicting write attempts (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = lookup(ROOT_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingConfiguration(ROOT_ENV.to_string()))?;

        let root_principal = Principal::new(root).map_err(|e| ConfigError::InvalidValue {
            key: ROOT_ENV.to_string(),
            message: e.to_string(),
        })?;

        let mut settings = Self::new(root_principal);

        if let Some(prefix) = lookup("RBAC_KEY_PREFIX") {
            if prefix.is_empty() || prefix.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    key: "RBAC_KEY_PREFIX".to_string(),
                    message: "must be non-empty and contain no whitespace".to_string(),
                });
            }
            settings.key_prefix = prefix;
        }

        if let Some(ms) = parse(&lookup, "RBAC_STORAGE_TIMEOUT_MS")? {
            settings.storage_timeout_ms = ms;
        }
        if let Some(ms) = parse(&lookup, "RBAC_NOTIFY_TIMEOUT_MS")? {
            settings.notify_timeout_ms = ms;
        }
        if let Some(attempts) = parse(&lookup, "RBAC_CAS_MAX_ATTEMPTS")? {
            settings.cas_max_attempts = attempts;
        }

        Ok(settings)
    }

    /// Storage timeout as a Duration.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// Alert delivery timeout as a Duration.
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// Role store configuration derived from these settings.
    pub fn role_store_config(&self) -> RoleStoreConfig {
        RoleStoreConfig {
            key_prefix: self.key_prefix.clone(),
            io_timeout: self.storage_timeout(),
            retry: RetryConfig::default().with_max_attempts(self.cas_max_attempts),
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}
