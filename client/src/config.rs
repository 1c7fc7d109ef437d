//! Client configuration parsed from environment variables.
//!
//! - `SKETCH_RELAY_URL`: relay socket URL, default `ws://127.0.0.1:4000/ws`
//! - `SKETCH_MOVE_INTERVAL_MS`: move coalescing interval, default `0` (off)

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::ClientError;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:4000/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub relay_url: String,
    /// Zero sends every move as it happens.
    pub move_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { relay_url: DEFAULT_RELAY_URL.to_owned(), move_interval: Duration::ZERO }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self { relay_url: relay_url.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_move_interval(mut self, interval: Duration) -> Self {
        self.move_interval = interval;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `SKETCH_MOVE_INTERVAL_MS` is set
    /// but is not a whole number.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Read configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let relay_url = lookup("SKETCH_RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_owned());
        let interval_ms = match lookup("SKETCH_MOVE_INTERVAL_MS") {
            None => 0,
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ClientError::Config {
                key: "SKETCH_MOVE_INTERVAL_MS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
        };
        Ok(Self { relay_url, move_interval: Duration::from_millis(interval_ms) })
    }
}
