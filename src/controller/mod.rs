//! # Controller
//!
//! Reconciliation logic for the templates controller.
//!
//! - `synchronizer`: per-key reconciliation of instances, bindings and secrets
//! - `events`: Kubernetes events for conditions users need to act on
//! - `touch`: forced re-evaluation of a templated instance

pub mod events;
pub mod synchronizer;
pub mod touch;

pub use events::{EventRecorder, KubeEventRecorder};
pub use synchronizer::Synchronizer;
pub use touch::touch_instance;
