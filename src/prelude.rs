//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use svcat_templates::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (TemplatedInstance, InstanceTemplate, ServiceBinding, etc.)
//! - Store traits and bundles (Lister, StoreClient, Listers, Clients)
//! - The template resolver and plan resolver trait
//! - The synchronizer and event recorder
//! - Config types (ControllerConfig, ServerConfig)
//! - The crate error type

// CRD types - most commonly used
pub use crate::crd::*;

// Store seams
pub use crate::store::{object_key, split_key, Clients, LabelFilter, Lister, Listers, StoreClient};

// Template resolution
pub use crate::template::{PlanResolver, TemplateResolver};

// Synchronization
pub use crate::controller::{touch_instance, EventRecorder, Synchronizer};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};

// Common error types
pub use crate::error::{Error, Result};
