//! Service Catalog Templates Controller Library
//!
//! Expands templated service instances and bindings into provisioned service
//! catalog resources, filling in defaults from broker, cluster and namespace
//! templates.
//!
//! ## Quick Start
//!
//! ```rust
//! use svcat_templates::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod builder;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
pub mod store;
pub mod template;

pub use error::{Error, Result};
