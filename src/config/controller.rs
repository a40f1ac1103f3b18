//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Concurrent reconciles per controller (instances, bindings, secrets)
    /// The same object is never reconciled twice at once
    pub worker_threads: usize,
    /// Exponential backoff starting value (milliseconds)
    /// Initial delay before retrying a key after an error
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value (milliseconds)
    /// Maximum delay between retries of a key
    pub backoff_max_ms: u64,
    /// Namespace to watch for templated resources
    /// `None` watches every namespace
    pub watch_namespace: Option<String>,
    /// Pod running the controller, reported as the event source instance
    pub pod_name: Option<String>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Enable metrics collection
    pub enable_metrics: bool,
    /// How long to wait for the cache to finish its initial list (seconds)
    pub cache_sync_timeout_secs: u64,
    /// Delay before a cleanly synchronized object is looked at again (seconds)
    pub resync_period_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_namespace: None,
            pod_name: None,
            log_level: "INFO".to_string(),
            log_enable_color: false,
            enable_metrics: true,
            cache_sync_timeout_secs: DEFAULT_CACHE_SYNC_TIMEOUT_SECS,
            resync_period_secs: DEFAULT_RESYNC_PERIOD_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        let worker_threads = parse_or_default(&lookup, "WORKER_THREADS", DEFAULT_WORKER_THREADS);
        Self {
            // Zero means unbounded to the controller runtime
            worker_threads: worker_threads.max(1),
            backoff_start_ms: parse_or_default(&lookup, "BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: parse_or_default(&lookup, "BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            pod_name: lookup("POD_NAME").filter(|name| !name.trim().is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            log_enable_color: bool_or_default(&lookup, "LOG_ENABLE_COLOR", false),
            enable_metrics: bool_or_default(&lookup, "ENABLE_METRICS", true),
            cache_sync_timeout_secs: parse_or_default(
                &lookup,
                "CACHE_SYNC_TIMEOUT_SECS",
                DEFAULT_CACHE_SYNC_TIMEOUT_SECS,
            ),
            resync_period_secs: parse_or_default(&lookup, "RESYNC_PERIOD_SECS", DEFAULT_RESYNC_PERIOD_SECS),
        }
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }

    /// Get backoff max duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Get cache sync timeout duration
    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_sync_timeout_secs)
    }

    /// Get resync period duration
    pub fn resync_period(&self) -> Duration {
        Duration::from_secs(self.resync_period_secs)
    }

    /// Default tracing filter directive derived from `log_level`
    pub fn env_filter_directive(&self) -> String {
        format!("svcat_templates={}", self.log_level.to_lowercase())
    }
}

/// Read a key and parse it, or return default value
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a key as boolean or return default
fn bool_or_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}
