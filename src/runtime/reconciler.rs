//! # Reconcilers
//!
//! The functions handed to `Controller::run` for each watched kind, and the error
//! policy they share.
//!
//! - a pass that reconciled something is requeued after the resync period, which
//!   also covers lag between a trigger and the shared caches
//! - a pass with nothing to do waits for the next change
//! - a retryable error is requeued with per-object exponential backoff
//! - any other error waits for the next change

use crate::controller::Synchronizer;
use crate::crd::{TemplatedBinding, TemplatedInstance};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::runtime::backoff::ItemBackoff;
use crate::store::object_key;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use kube::Resource;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// State shared by the instance, binding and secret controllers
pub struct Context {
    synchronizer: Synchronizer,
    retries: Mutex<ItemBackoff>,
    resync: Duration,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("resync", &self.resync)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(synchronizer: Synchronizer, retries: ItemBackoff, resync: Duration) -> Self {
        Self {
            synchronizer,
            retries: Mutex::new(retries),
            resync,
        }
    }

    /// Time one pass, record it, and clear the object's backoff history on success
    async fn observe<K, T, F>(&self, obj: &K, pass: F) -> Result<Action>
    where
        K: Resource<DynamicType = ()>,
        F: Future<Output = Result<Option<T>>>,
    {
        let kind = K::kind(&());
        let started = Instant::now();
        metrics::increment_reconciliations(&kind);
        let outcome = pass.await;
        metrics::observe_reconciliation_duration(&kind, started.elapsed().as_secs_f64());

        let synced = outcome?;
        self.retries().forget(&retry_key(obj));
        Ok(match synced {
            Some(_) => Action::requeue(self.resync),
            None => Action::await_change(),
        })
    }

    fn retries(&self) -> MutexGuard<'_, ItemBackoff> {
        self.retries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub async fn reconcile_instance(instance: Arc<TemplatedInstance>, ctx: Arc<Context>) -> Result<Action> {
    let key = object_key(&instance.metadata);
    ctx.observe(instance.as_ref(), ctx.synchronizer.synchronize_instance(&key))
        .await
}

pub async fn reconcile_binding(binding: Arc<TemplatedBinding>, ctx: Arc<Context>) -> Result<Action> {
    let key = object_key(&binding.metadata);
    ctx.observe(binding.as_ref(), ctx.synchronizer.synchronize_binding(&key))
        .await
}

/// Every secret in scope comes through here; only `-shadow` secrets do any work
pub async fn reconcile_secret(secret: Arc<Secret>, ctx: Arc<Context>) -> Result<Action> {
    let key = object_key(&secret.metadata);
    ctx.observe(secret.as_ref(), ctx.synchronizer.synchronize_secret(&key))
        .await
}

/// Decide when a failed object is tried again
#[allow(
    clippy::needless_pass_by_value,
    reason = "Signature required by Controller::run"
)]
pub fn error_policy<K>(obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let key = object_key(obj.meta());
    metrics::increment_reconciliation_errors(&kind, error.reason());

    if !error.is_retryable() {
        error!(kind = %kind, key = %key, error = %error, "synchronization failed, waiting for a change");
        ctx.retries().forget(&retry_key(obj.as_ref()));
        return Action::await_change();
    }

    let (delay, failures) = {
        let mut retries = ctx.retries();
        let retry = retry_key(obj.as_ref());
        let delay = retries.next_delay(&retry);
        (delay, retries.failures(&retry))
    };
    metrics::increment_requeues(&kind);
    warn!(
        kind = %kind,
        key = %key,
        error = %error,
        failures,
        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "synchronization failed, requeueing with backoff"
    );
    Action::requeue(delay)
}

/// Backoff key, qualified by kind since a secret and an instance can share a name
fn retry_key<K: Resource<DynamicType = ()>>(obj: &K) -> String {
    format!("{}:{}", K::kind(&()), object_key(obj.meta()))
}
