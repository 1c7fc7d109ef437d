//! Relay configuration parsed from environment variables.
//!
//! - `RELAY_HOST`: bind address, default `0.0.0.0`
//! - `PORT`: listen port, default `4000`
//! - `RELAY_QUEUE_CAPACITY`: per-session outbound queue, default `256`
//! - `RELAY_ALLOWED_ORIGIN`: CORS origin, any origin when unset
//!
//! A variable that is set but unparseable is an error, not a silent default.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::fmt::Display;
use std::str::FromStr;

use axum::http::HeaderValue;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub queue_capacity: usize,
    pub allowed_origin: Option<HeaderValue>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            allowed_origin: None,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a variable that is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// or `None` when unset.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("RELAY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = env_parse(&lookup, "PORT", DEFAULT_PORT)?;
        let queue_capacity = env_parse(&lookup, "RELAY_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "RELAY_QUEUE_CAPACITY",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        let allowed_origin = match lookup("RELAY_ALLOWED_ORIGIN") {
            Some(raw) if raw != "*" => Some(HeaderValue::from_str(&raw).map_err(|e| ConfigError::Invalid {
                key: "RELAY_ALLOWED_ORIGIN",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            _ => None,
        };
        Ok(Self { host, port, queue_capacity, allowed_origin })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse `key` through `lookup`, falling back to `default` when unset.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the value is set but does not parse.
pub fn env_parse<T>(lookup: impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid { key, value: raw.clone(), reason: e.to_string() })
}

fn env_var(key: &str) -> Option<String> {
    std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
}
