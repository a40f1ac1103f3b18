//! # Controller Loop
//!
//! Builds one `kube::runtime::Controller` per reconciled kind, then runs them
//! until shutdown.
//!
//! | Controller          | Owns                | Also watches                                |
//! |---------------------|---------------------|---------------------------------------------|
//! | `TemplatedInstance` | `ServiceInstance`   | instance templates at every tier            |
//! | `TemplatedBinding`  | `ServiceBinding`    | binding templates at every tier             |
//! | `Secret`            | republished secrets | `ServiceBinding`, for its `-shadow` secret  |

use crate::constants::{CONTROLLER_NAME, WATCH_TIMEOUT_SECS};
use crate::controller::{KubeEventRecorder, Synchronizer};
use crate::crd::{
    BindingTemplate, BrokerBindingTemplate, BrokerInstanceTemplate, ClusterBindingTemplate,
    ClusterInstanceTemplate, InstanceTemplate, ServiceBinding, ServiceInstance, TemplatedBinding,
    TemplatedInstance,
};
use crate::runtime::backoff::ItemBackoff;
use crate::runtime::initialization::InitializationResult;
use crate::runtime::reconciler::{
    error_policy, reconcile_binding, reconcile_instance, reconcile_secret, Context,
};
use crate::runtime::triggers::{bindings_for_template, instances_for_template, shadow_secret_for_binding};
use crate::store::cache::{scoped_api, Cache};
use crate::store::Clients;
use crate::template::UnimplementedPlanResolver;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::{Action, Config as ControllerSettings, Error as ControllerError};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::Controller;
use kube::{Api, Resource};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run the controllers until the shutdown signal fires
///
/// # Errors
///
/// Fails when the caches do not sync.
pub async fn run(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        config,
        server_state,
        server_handle,
        shutdown,
    } = init;
    let ns = config.watch_namespace.as_deref();
    let watch_config = || WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS);

    let instances = Controller::new(scoped_api::<TemplatedInstance>(&client, ns), watch_config());
    let bindings = Controller::new(scoped_api::<TemplatedBinding>(&client, ns), watch_config());
    let secrets = Controller::new(scoped_api::<Secret>(&client, ns), watch_config());

    let mut cache = Cache::new(client.clone(), config.watch_namespace.clone());
    let listers = cache.listers(instances.store(), bindings.store(), secrets.store());

    let synchronizer = Synchronizer::new(
        listers.clone(),
        Clients::kube(&client, CONTROLLER_NAME),
        Arc::new(UnimplementedPlanResolver),
        Arc::new(KubeEventRecorder::new(client.clone(), config.pod_name.clone())),
    );
    let context = Arc::new(Context::new(
        synchronizer,
        ItemBackoff::new(config.backoff_start_duration(), config.backoff_max_duration()),
        config.resync_period(),
    ));

    cache.start(shutdown.clone(), config.cache_sync_timeout()).await?;

    let settings = ControllerSettings::default()
        .concurrency(u16::try_from(config.worker_threads).unwrap_or(u16::MAX));

    let (l1, l2, l3) = (listers.clone(), listers.clone(), listers.clone());
    let instance_run = instances
        .with_config(settings.clone())
        .owns(scoped_api::<ServiceInstance>(&client, ns), watch_config())
        .watches(scoped_api::<InstanceTemplate>(&client, ns), watch_config(), move |t| {
            instances_for_template(&l1, &t)
        })
        .watches(Api::<ClusterInstanceTemplate>::all(client.clone()), watch_config(), move |t| {
            instances_for_template(&l2, &t)
        })
        .watches(Api::<BrokerInstanceTemplate>::all(client.clone()), watch_config(), move |t| {
            instances_for_template(&l3, &t)
        })
        .graceful_shutdown_on(shutdown_requested(shutdown.clone()))
        .run(reconcile_instance, error_policy::<TemplatedInstance>, Arc::clone(&context))
        .for_each(log_reconcile_result("TemplatedInstance"));

    let (l1, l2, l3) = (listers.clone(), listers.clone(), listers);
    let binding_run = bindings
        .with_config(settings.clone())
        .owns(scoped_api::<ServiceBinding>(&client, ns), watch_config())
        .watches(scoped_api::<BindingTemplate>(&client, ns), watch_config(), move |t| {
            bindings_for_template(&l1, &t)
        })
        .watches(Api::<ClusterBindingTemplate>::all(client.clone()), watch_config(), move |t| {
            bindings_for_template(&l2, &t)
        })
        .watches(Api::<BrokerBindingTemplate>::all(client.clone()), watch_config(), move |t| {
            bindings_for_template(&l3, &t)
        })
        .graceful_shutdown_on(shutdown_requested(shutdown.clone()))
        .run(reconcile_binding, error_policy::<TemplatedBinding>, Arc::clone(&context))
        .for_each(log_reconcile_result("TemplatedBinding"));

    // a republished secret is controlled by the shadow secret it was copied from
    let secret_run = secrets
        .with_config(settings)
        .owns(scoped_api::<Secret>(&client, ns), watch_config())
        .watches(scoped_api::<ServiceBinding>(&client, ns), watch_config(), |binding| {
            shadow_secret_for_binding(&binding)
        })
        .graceful_shutdown_on(shutdown_requested(shutdown.clone()))
        .run(reconcile_secret, error_policy::<Secret>, context)
        .for_each(log_reconcile_result("Secret"));

    server_state.mark_ready();
    info!(concurrency = config.worker_threads, "controllers ready");

    tokio::join!(instance_run, binding_run, secret_run);

    cache.stopped().await;
    if let Err(e) = server_handle.await {
        warn!(error = %e, "HTTP server task ended abnormally");
    }
    info!("controllers stopped");
    Ok(())
}

/// Resolves once `shutdown` flips to `true` (or its sender drops)
fn shutdown_requested(mut shutdown: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + Sync {
    async move {
        loop {
            let stop = *shutdown.borrow_and_update();
            if stop || shutdown.changed().await.is_err() {
                break;
            }
        }
    }
}

type RunResult<K> = std::result::Result<
    (ObjectRef<K>, Action),
    ControllerError<crate::Error, watcher::Error>,
>;

fn log_reconcile_result<K>(kind: &'static str) -> impl Fn(RunResult<K>) -> std::future::Ready<()>
where
    K: Resource<DynamicType = ()>,
{
    move |result| {
        match result {
            Ok((object, action)) => debug!(kind, object = %object.name, ?action, "reconciliation completed"),
            // already reported by the error policy
            Err(ControllerError::ReconcilerFailed(..)) => {}
            Err(e) => warn!(kind, error = %e, "controller error"),
        }
        std::future::ready(())
    }
}
