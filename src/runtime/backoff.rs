//! # Exponential Backoff
//!
//! Per-object retry delays for the controllers' error policy.
//!
//! `Action::requeue` carries no attempt count, so failures are counted here. Each
//! failing key doubles its delay from `start` up to `max`:
//! 1s, 2s, 4s, 8s, 16s, 30s (max) with the defaults. A key's history is cleared
//! by [`ItemBackoff::forget`] once it synchronizes successfully.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use svcat_templates::runtime::backoff::ItemBackoff;
//!
//! let mut backoff = ItemBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
//! assert_eq!(backoff.next_delay("shop/orders-db"), Duration::from_secs(1));
//! assert_eq!(backoff.next_delay("shop/orders-db"), Duration::from_secs(2));
//! backoff.forget("shop/orders-db");
//! assert_eq!(backoff.next_delay("shop/orders-db"), Duration::from_secs(1));
//! ```

use std::collections::HashMap;
use std::time::Duration;

/// Exponential delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Delay after the first failure
    start: Duration,
    /// Cap on any delay
    max: Duration,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(start: Duration, max: Duration) -> Self {
        Self {
            start,
            max: max.max(start),
        }
    }

    /// Delay after `failures` consecutive failures (`failures >= 1`)
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.start
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }
}

/// Failure counts per key
#[derive(Debug, Clone)]
pub struct ItemBackoff {
    schedule: ExponentialBackoff,
    failures: HashMap<String, u32>,
}

impl ItemBackoff {
    #[must_use]
    pub fn new(start: Duration, max: Duration) -> Self {
        Self {
            schedule: ExponentialBackoff::new(start, max),
            failures: HashMap::new(),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying it
    pub fn next_delay(&mut self, key: &str) -> Duration {
        let failures = self.failures.entry(key.to_string()).or_insert(0);
        *failures = failures.saturating_add(1);
        self.schedule.delay(*failures)
    }

    /// Clear the failure history of `key`
    pub fn forget(&mut self, key: &str) {
        self.failures.remove(key);
    }

    /// Consecutive failures recorded for `key`
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }
}
