//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of every templating resource
pub const TEMPLATES_GROUP: &str = "templates.servicecatalog.k8s.io";

/// API group of the provisioning resources owned by the controller
pub const SERVICE_CATALOG_GROUP: &str = "servicecatalog.k8s.io";

/// Label used to tag templates (and templated resources) with their service type
pub const SERVICE_TYPE_LABEL: &str = "templates.servicecatalog.k8s.io/service-type";

/// Suffix appended to a desired secret name to get the secret the provisioned binding writes
pub const SHADOW_SECRET_SUFFIX: &str = "-shadow";

/// Field manager / event reporter name
pub const CONTROLLER_NAME: &str = "svcat-templates-controller";

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default number of concurrent reconciles per controller
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Default exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Attempts made by `touch` before a write conflict is surfaced to the caller
pub const MAX_TOUCH_ATTEMPTS: u32 = 5;

/// How long to wait for the read-through cache to finish its initial list (seconds)
pub const DEFAULT_CACHE_SYNC_TIMEOUT_SECS: u64 = 120;

/// Default delay before an object that synchronized cleanly is looked at again (seconds)
pub const DEFAULT_RESYNC_PERIOD_SECS: u64 = 300;

/// Server-side watch timeout (seconds)
///
/// Must stay below the client read timeout (30s) so idle watches are closed by the
/// API server rather than timing out on the client.
pub const WATCH_TIMEOUT_SECS: u32 = 25;
