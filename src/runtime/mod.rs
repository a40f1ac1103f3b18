//! # Runtime
//!
//! Controller wiring and process lifecycle.
//!
//! - `backoff.rs` - per-object exponential retry delays
//! - `triggers.rs` - maps related-kind changes to objects to reconcile
//! - `reconciler.rs` - reconcile functions and the shared error policy
//! - `initialization.rs` - tracing, metrics, HTTP server, client, signals
//! - `controller.rs` - builds the controllers and runs them until shutdown

pub mod backoff;
pub mod controller;
pub mod initialization;
pub mod reconciler;
pub mod triggers;
