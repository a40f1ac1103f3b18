//! # Synchronizer
//!
//! Reconciles one `namespace/name` key at a time, for each of the three watched kinds.
//!
//! - `instance.rs` - templated instance -> provisioned instance
//! - `binding.rs` - templated binding -> provisioned binding
//! - `secret.rs` - provisioned binding secret -> republished secret
//! - `managed.rs` - which objects belong to this controller
//!
//! Every entry point returns `Ok(None)` when there is nothing to do (the key is
//! malformed or the object is gone) and `Ok(Some(obj))` with the latest state of
//! the object it reconciled. Errors are returned to the controllers' error
//! policy, which decides whether to retry via [`crate::Error::is_retryable`].
//!
//! Provisioned objects are only ever modified when controlled by the templated
//! resource being synchronized. Anything else is reported with a warning event
//! and left untouched.

mod binding;
mod instance;
pub mod managed;
mod secret;

pub use managed::{is_managed, managed_binding_for_secret};

use crate::controller::events::{EventRecorder, REASON_UNMANAGED};
use crate::error::Error;
use crate::observability::metrics;
use crate::store::{split_key, Clients, Listers};
use crate::template::{PlanResolver, TemplateResolver};
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{error, warn};

/// Reconciles templated resources into provisioned resources
#[derive(Clone)]
pub struct Synchronizer {
    listers: Listers,
    clients: Clients,
    resolver: TemplateResolver,
    events: Arc<dyn EventRecorder>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer").finish_non_exhaustive()
    }
}

impl Synchronizer {
    pub fn new(
        listers: Listers,
        clients: Clients,
        plans: Arc<dyn PlanResolver>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        let resolver = TemplateResolver::new(listers.clone(), plans);
        Self {
            listers,
            clients,
            resolver,
            events,
        }
    }

    /// Report a provisioned object controlled by something other than `templated`
    async fn reject_unmanaged<T, P>(&self, templated: &T, provisioned: &P) -> Error
    where
        T: Resource<DynamicType = ()>,
        P: Resource<DynamicType = ()>,
    {
        let kind = P::kind(&()).to_string();
        metrics::increment_unmanaged_conflicts(&kind);
        let error = Error::UnmanagedResource {
            kind,
            namespace: provisioned.namespace().unwrap_or_default(),
            name: provisioned.name_any(),
        };
        warn!(error = %error, "refusing to modify object controlled by someone else");
        self.events
            .warning(&templated.object_ref(&()), REASON_UNMANAGED, &error.to_string())
            .await;
        error
    }
}

/// Split an object key, logging and swallowing malformed keys
fn parse_key(key: &str) -> Option<(String, String)> {
    match split_key(key) {
        Ok(parts) => Some(parts),
        Err(e) => {
            error!(error = %e, "dropping malformed object key");
            None
        }
    }
}

fn now() -> Option<String> {
    Some(chrono::Utc::now().to_rfc3339())
}
