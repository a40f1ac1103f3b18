//! # Server Configuration
//!
//! HTTP server settings for the metrics and health endpoints.

use std::time::Duration;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port serving `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// How long startup waits for the server to bind (seconds)
    pub startup_timeout_secs: u64,
    /// How often startup polls the server state (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            metrics_port: lookup("METRICS_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.metrics_port),
            startup_timeout_secs: parse("SERVER_STARTUP_TIMEOUT_SECS")
                .unwrap_or(defaults.startup_timeout_secs),
            poll_interval_ms: parse("SERVER_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval_ms),
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_overrides() {
        let config = ServerConfig::from_lookup(|key| match key {
            "METRICS_PORT" => Some("9090".to_string()),
            "SERVER_POLL_INTERVAL_MS" => Some("bogus".to_string()),
            _ => None,
        });
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.poll_interval(), Duration::from_millis(crate::constants::DEFAULT_SERVER_POLL_INTERVAL_MS));
        assert_eq!(config.startup_timeout_secs, crate::constants::DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    }

    #[test]
    fn test_port_out_of_range_falls_back() {
        let config = ServerConfig::from_lookup(|key| (key == "METRICS_PORT").then(|| "70000".to_string()));
        assert_eq!(config.metrics_port, crate::constants::DEFAULT_METRICS_PORT);
    }
}
