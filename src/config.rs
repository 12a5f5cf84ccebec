//! Server configuration from environment variables
//!
//! - `ALERTBRIDGE_HOST`: bind address (default: 0.0.0.0)
//! - `ALERTBRIDGE_PORT`: port number (default: 3000)
//! - `ALERTBRIDGE_INTERVAL`: how often silent watchdogs are checked (default: 10s)
//! - `ALERTBRIDGE_EXPIRY`: silence after which a watchdog fires (default: 2m)
//! - `ALERTBRIDGE_EVICT_AFTER`: drop idle watchdogs silent this long (default: never)
//! - `ALERTBRIDGE_TEMPLATE_DIR`: directory with template overrides
//! - `ALERTBRIDGE_CHAT_URL`: chat incoming-webhook URL (default: log messages)
//! - `ALERTBRIDGE_CHAT_CHANNEL`: channel or user to post to

use std::path::PathBuf;
use std::time::Duration;

pub const HOST_VAR: &str = "ALERTBRIDGE_HOST";
pub const PORT_VAR: &str = "ALERTBRIDGE_PORT";
pub const INTERVAL_VAR: &str = "ALERTBRIDGE_INTERVAL";
pub const EXPIRY_VAR: &str = "ALERTBRIDGE_EXPIRY";
pub const EVICT_AFTER_VAR: &str = "ALERTBRIDGE_EVICT_AFTER";
pub const TEMPLATE_DIR_VAR: &str = "ALERTBRIDGE_TEMPLATE_DIR";
pub const CHAT_URL_VAR: &str = "ALERTBRIDGE_CHAT_URL";
pub const CHAT_CHANNEL_VAR: &str = "ALERTBRIDGE_CHAT_CHANNEL";

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Sweep interval
    pub interval: Duration,
    /// Silence before a watchdog fires
    pub expiry: Duration,
    pub evict_after: Option<Duration>,
    pub template_dir: Option<PathBuf>,
    pub chat_url: Option<String>,
    pub chat_channel: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            interval: Duration::from_secs(10),
            expiry: Duration::from_secs(120),
            evict_after: None,
            template_dir: None,
            chat_url: None,
            chat_channel: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get(PORT_VAR) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => defaults.port,
        };

        let config = Self {
            host: get(HOST_VAR).unwrap_or(defaults.host),
            port,
            interval: parse_duration(INTERVAL_VAR, get(INTERVAL_VAR))?
                .unwrap_or(defaults.interval),
            expiry: parse_duration(EXPIRY_VAR, get(EXPIRY_VAR))?.unwrap_or(defaults.expiry),
            evict_after: parse_duration(EVICT_AFTER_VAR, get(EVICT_AFTER_VAR))?,
            template_dir: get(TEMPLATE_DIR_VAR).map(PathBuf::from),
            chat_url: get(CHAT_URL_VAR),
            chat_channel: get(CHAT_CHANNEL_VAR),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check duration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::NotPositive(INTERVAL_VAR));
        }
        if self.expiry.is_zero() {
            return Err(ConfigError::NotPositive(EXPIRY_VAR));
        }
        if self.evict_after.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::NotPositive(EVICT_AFTER_VAR));
        }
        if self.expiry < self.interval {
            return Err(ConfigError::ExpiryBelowInterval {
                expiry: self.expiry,
                interval: self.interval,
            });
        }
        if self.expiry < self.interval * 2 {
            tracing::warn!(
                "Expiry {:?} is less than twice the sweep interval {:?}; watchdogs may fire late",
                self.expiry,
                self.interval
            );
        }
        if let Some(evict_after) = self.evict_after {
            if evict_after <= self.expiry {
                return Err(ConfigError::EvictionBelowExpiry {
                    evict_after,
                    expiry: self.expiry,
                });
            }
        }
        Ok(())
    }
}

fn parse_duration(name: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|v| {
            humantime::parse_duration(v.trim()).map_err(|source| ConfigError::InvalidDuration {
                name,
                value: v.clone(),
                source,
            })
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid duration for {name}: {value:?} ({source})")]
    InvalidDuration {
        name: &'static str,
        value: String,
        source: humantime::DurationError,
    },

    #[error("{0} must be a positive duration")]
    NotPositive(&'static str),

    #[error("Expiry {expiry:?} must not be shorter than the sweep interval {interval:?}")]
    ExpiryBelowInterval { expiry: Duration, interval: Duration },

    #[error("Eviction age {evict_after:?} must be longer than the expiry {expiry:?}")]
    EvictionBelowExpiry {
        evict_after: Duration,
        expiry: Duration,
    },
}
