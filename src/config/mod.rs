//! # Configuration
//!
//! Controller and server configuration loaded from the environment.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;
