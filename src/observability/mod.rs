//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//!
//! Logging goes through `tracing`; the subscriber is installed at startup in
//! `runtime::initialization`.

pub mod metrics;

// Re-export for convenience
pub use metrics::*;
