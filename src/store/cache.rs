//! # Read-Through Cache
//!
//! One reflector per kind the synchronizer reads but no controller reconciles:
//! the six template kinds and the provisioned instances and bindings. The
//! reconciled kinds are read from their controllers' own stores, so the object
//! being reconciled is always visible to its lister.
//!
//! Reads from the cache may lag the API server. Writes never go through it.

use crate::constants::WATCH_TIMEOUT_SECS;
use crate::store::kube::CachedLister;
use crate::store::Listers;
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::crd::{
    BindingTemplate, BrokerBindingTemplate, BrokerInstanceTemplate, ClusterBindingTemplate,
    ClusterInstanceTemplate, InstanceTemplate, ServiceBinding, ServiceInstance, TemplatedBinding,
    TemplatedInstance,
};

/// Reader and (until started) writer half of one reflector store
struct Reflected<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    reader: Store<K>,
    writer: Option<Writer<K>>,
}

impl<K> Reflected<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn new() -> Self {
        let (reader, writer) = reflector::store();
        Self {
            reader,
            writer: Some(writer),
        }
    }

    fn take_writer(&mut self) -> Result<Writer<K>> {
        self.writer
            .take()
            .ok_or_else(|| anyhow!("{} cache already started", K::kind(&())))
    }
}

/// Local cache of every kind the controller reads
pub struct Cache {
    client: Client,
    namespace: Option<String>,
    instance_templates: Reflected<InstanceTemplate>,
    cluster_instance_templates: Reflected<ClusterInstanceTemplate>,
    broker_instance_templates: Reflected<BrokerInstanceTemplate>,
    binding_templates: Reflected<BindingTemplate>,
    cluster_binding_templates: Reflected<ClusterBindingTemplate>,
    broker_binding_templates: Reflected<BrokerBindingTemplate>,
    service_instances: Reflected<ServiceInstance>,
    service_bindings: Reflected<ServiceBinding>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("namespace", &self.namespace)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Cache watching one namespace, or all namespaces when `namespace` is `None`.
    ///
    /// Cluster-scoped templates are always watched cluster-wide.
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            client,
            namespace,
            instance_templates: Reflected::new(),
            cluster_instance_templates: Reflected::new(),
            broker_instance_templates: Reflected::new(),
            binding_templates: Reflected::new(),
            cluster_binding_templates: Reflected::new(),
            broker_binding_templates: Reflected::new(),
            service_instances: Reflected::new(),
            service_bindings: Reflected::new(),
            tasks: Vec::new(),
        }
    }

    /// Listers over the cached stores, plus the stores of the three controllers.
    ///
    /// Empty until [`Cache::start`] syncs and the controllers run.
    pub fn listers(
        &self,
        templated_instances: Store<TemplatedInstance>,
        templated_bindings: Store<TemplatedBinding>,
        secrets: Store<Secret>,
    ) -> Listers {
        Listers {
            templated_instances: Arc::new(CachedLister::new(templated_instances)),
            templated_bindings: Arc::new(CachedLister::new(templated_bindings)),
            instance_templates: Arc::new(CachedLister::new(self.instance_templates.reader.clone())),
            cluster_instance_templates: Arc::new(CachedLister::new(
                self.cluster_instance_templates.reader.clone(),
            )),
            broker_instance_templates: Arc::new(CachedLister::new(
                self.broker_instance_templates.reader.clone(),
            )),
            binding_templates: Arc::new(CachedLister::new(self.binding_templates.reader.clone())),
            cluster_binding_templates: Arc::new(CachedLister::new(
                self.cluster_binding_templates.reader.clone(),
            )),
            broker_binding_templates: Arc::new(CachedLister::new(
                self.broker_binding_templates.reader.clone(),
            )),
            service_instances: Arc::new(CachedLister::new(self.service_instances.reader.clone())),
            service_bindings: Arc::new(CachedLister::new(self.service_bindings.reader.clone())),
            secrets: Arc::new(CachedLister::new(secrets)),
        }
    }

    /// Start every reflector and wait for the initial list of each kind.
    ///
    /// Reflectors stop when `shutdown` flips to `true` (or its sender drops).
    ///
    /// # Errors
    ///
    /// Fails when called twice or when a kind does not finish its initial list
    /// within `sync_timeout`.
    pub async fn start(&mut self, shutdown: watch::Receiver<bool>, sync_timeout: Duration) -> Result<()> {
        let namespace = self.namespace.clone();
        let ns = namespace.as_deref();
        info!(namespace = ns.unwrap_or("<all>"), "starting resource caches");

        let api = scoped_api::<InstanceTemplate>(&self.client, ns);
        self.tasks.push(spawn_reflector(api, self.instance_templates.take_writer()?, shutdown.clone()));
        let api = Api::<ClusterInstanceTemplate>::all(self.client.clone());
        self.tasks.push(spawn_reflector(api, self.cluster_instance_templates.take_writer()?, shutdown.clone()));
        let api = Api::<BrokerInstanceTemplate>::all(self.client.clone());
        self.tasks.push(spawn_reflector(api, self.broker_instance_templates.take_writer()?, shutdown.clone()));

        let api = scoped_api::<BindingTemplate>(&self.client, ns);
        self.tasks.push(spawn_reflector(api, self.binding_templates.take_writer()?, shutdown.clone()));
        let api = Api::<ClusterBindingTemplate>::all(self.client.clone());
        self.tasks.push(spawn_reflector(api, self.cluster_binding_templates.take_writer()?, shutdown.clone()));
        let api = Api::<BrokerBindingTemplate>::all(self.client.clone());
        self.tasks.push(spawn_reflector(api, self.broker_binding_templates.take_writer()?, shutdown.clone()));

        let api = scoped_api::<ServiceInstance>(&self.client, ns);
        self.tasks.push(spawn_reflector(api, self.service_instances.take_writer()?, shutdown.clone()));
        let api = scoped_api::<ServiceBinding>(&self.client, ns);
        self.tasks.push(spawn_reflector(api, self.service_bindings.take_writer()?, shutdown));

        wait_synced(&self.instance_templates.reader, sync_timeout).await?;
        wait_synced(&self.cluster_instance_templates.reader, sync_timeout).await?;
        wait_synced(&self.broker_instance_templates.reader, sync_timeout).await?;
        wait_synced(&self.binding_templates.reader, sync_timeout).await?;
        wait_synced(&self.cluster_binding_templates.reader, sync_timeout).await?;
        wait_synced(&self.broker_binding_templates.reader, sync_timeout).await?;
        wait_synced(&self.service_instances.reader, sync_timeout).await?;
        wait_synced(&self.service_bindings.reader, sync_timeout).await?;

        info!("resource caches synced");
        Ok(())
    }

    /// Wait for every reflector task to exit after shutdown
    pub async fn stopped(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "cache task ended abnormally");
            }
        }
    }
}

/// Api for a namespaced kind, limited to `namespace` when one is set
pub fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

fn spawn_reflector<K>(api: Api<K>, writer: Writer<K>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let kind = K::kind(&()).to_string();
        let config = watcher::Config::default().timeout(WATCH_TIMEOUT_SECS);
        let stream = reflector::reflector(writer, watcher(api, config).default_backoff()).touched_objects();
        futures::pin_mut!(stream);

        loop {
            tokio::select! {
                changed = shutdown.wait_for(|stop| *stop) => {
                    if changed.is_err() {
                        debug!(kind = %kind, "shutdown sender dropped");
                    }
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(_)) => {}
                    // the watcher retries with backoff on its own
                    Some(Err(e)) => warn!(kind = %kind, error = %e, "watch error"),
                    None => break,
                },
            }
        }
        debug!(kind = %kind, "cache stopped");
    })
}

async fn wait_synced<K>(store: &Store<K>, timeout: Duration) -> Result<()>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    tokio::time::timeout(timeout, store.wait_until_ready())
        .await
        .with_context(|| format!("timed out syncing {} cache", K::kind(&())))?
        .with_context(|| format!("{} cache writer dropped", K::kind(&())))
}
