//! # Memory Store
//!
//! In-process implementation of both [`Lister`] and [`StoreClient`].
//!
//! Follows API server semantics closely enough to drive the synchronizers in
//! tests: uids are assigned on create, every write bumps the resource version,
//! and writes carrying a stale resource version fail with a conflict.

use crate::crd::{
    BindingTemplate, BrokerBindingTemplate, BrokerInstanceTemplate, ClusterBindingTemplate,
    ClusterInstanceTemplate, InstanceTemplate, ServiceBinding, ServiceInstance, TemplatedBinding,
    TemplatedInstance,
};
use crate::error::{Error, Result};
use crate::store::{in_scope, Clients, LabelFilter, Lister, Listers, StoreClient};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Resource;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type ObjectKey = (String, String);

/// Thread-safe in-memory object store for one kind
#[derive(Debug)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<ObjectKey, K>>,
    writes: AtomicUsize,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
        }
    }
}

impl<K> MemoryStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write.
    ///
    /// Assigns a uid and resource version when missing and replaces any
    /// object with the same key.
    pub fn insert(&self, mut obj: K) -> K {
        stamp_new(&mut obj);
        self.lock().insert(key_of(&obj), obj.clone());
        obj
    }

    /// Number of create, update, status and delete calls that succeeded
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored object
    pub fn all(&self) -> Vec<K> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ObjectKey, K>> {
        // poisoned only by a panicking caller; the map itself stays valid
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn replace(&self, obj: &K) -> Result<K> {
        let key = key_of(obj);
        let mut objects = self.lock();
        let Some(current) = objects.get(&key) else {
            return Err(not_found::<K>(&key));
        };

        let current_version = current.meta().resource_version.clone();
        if let Some(wanted) = obj.meta().resource_version.as_deref() {
            if current_version.as_deref() != Some(wanted) {
                return Err(Error::Conflict {
                    kind: K::kind(&()).to_string(),
                    name: display_key(&key),
                    message: format!(
                        "resource version {wanted} is stale, current is {}",
                        current_version.as_deref().unwrap_or("none")
                    ),
                });
            }
        }

        let mut stored = obj.clone();
        stored.meta_mut().uid.clone_from(&current.meta().uid);
        stored.meta_mut().resource_version = Some(next_version(current_version.as_deref()));
        objects.insert(key, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }
}

fn key_of<K: Resource>(obj: &K) -> ObjectKey {
    (
        obj.meta().namespace.clone().unwrap_or_default(),
        obj.meta().name.clone().unwrap_or_default(),
    )
}

fn display_key((namespace, name): &ObjectKey) -> String {
    if namespace.is_empty() {
        name.clone()
    } else {
        format!("{namespace}/{name}")
    }
}

fn not_found<K: Resource<DynamicType = ()>>(key: &ObjectKey) -> Error {
    Error::NotFound {
        kind: K::kind(&()).to_string(),
        name: display_key(key),
    }
}

fn stamp_new<K: Resource>(obj: &mut K) {
    let meta = obj.meta_mut();
    if meta.uid.is_none() {
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
    }
    if meta.resource_version.is_none() {
        meta.resource_version = Some("1".to_string());
    }
}

fn next_version(current: Option<&str>) -> String {
    let current = current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    (current + 1).to_string()
}

impl<K> Lister<K> for MemoryStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        let key = (namespace.unwrap_or_default().to_string(), name.to_string());
        self.lock().get(&key).cloned()
    }

    fn list(&self, namespace: Option<&str>, filter: &LabelFilter) -> Vec<K> {
        self.lock()
            .values()
            .filter(|obj| in_scope(obj.meta(), namespace, filter))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl<K> StoreClient<K> for MemoryStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(Lister::get(self, Some(namespace), name))
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let key = key_of(obj);
        let mut objects = self.lock();
        if objects.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: K::kind(&()).to_string(),
                name: display_key(&key),
            });
        }
        let mut stored = obj.clone();
        stored.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
        stored.meta_mut().resource_version = Some("1".to_string());
        objects.insert(key, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.replace(obj)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.replace(obj)
    }
}

/// One memory store per kind, wired into [`Listers`] and [`Clients`]
#[derive(Debug, Default, Clone)]
pub struct MemoryCluster {
    pub templated_instances: Arc<MemoryStore<TemplatedInstance>>,
    pub templated_bindings: Arc<MemoryStore<TemplatedBinding>>,
    pub instance_templates: Arc<MemoryStore<InstanceTemplate>>,
    pub cluster_instance_templates: Arc<MemoryStore<ClusterInstanceTemplate>>,
    pub broker_instance_templates: Arc<MemoryStore<BrokerInstanceTemplate>>,
    pub binding_templates: Arc<MemoryStore<BindingTemplate>>,
    pub cluster_binding_templates: Arc<MemoryStore<ClusterBindingTemplate>>,
    pub broker_binding_templates: Arc<MemoryStore<BrokerBindingTemplate>>,
    pub service_instances: Arc<MemoryStore<ServiceInstance>>,
    pub service_bindings: Arc<MemoryStore<ServiceBinding>>,
    pub secrets: Arc<MemoryStore<Secret>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listers reading straight from the stores, with no cache lag
    pub fn listers(&self) -> Listers {
        Listers {
            templated_instances: Arc::clone(&self.templated_instances) as Arc<dyn Lister<_>>,
            templated_bindings: Arc::clone(&self.templated_bindings) as Arc<dyn Lister<_>>,
            instance_templates: Arc::clone(&self.instance_templates) as Arc<dyn Lister<_>>,
            cluster_instance_templates: Arc::clone(&self.cluster_instance_templates) as Arc<dyn Lister<_>>,
            broker_instance_templates: Arc::clone(&self.broker_instance_templates) as Arc<dyn Lister<_>>,
            binding_templates: Arc::clone(&self.binding_templates) as Arc<dyn Lister<_>>,
            cluster_binding_templates: Arc::clone(&self.cluster_binding_templates) as Arc<dyn Lister<_>>,
            broker_binding_templates: Arc::clone(&self.broker_binding_templates) as Arc<dyn Lister<_>>,
            service_instances: Arc::clone(&self.service_instances) as Arc<dyn Lister<_>>,
            service_bindings: Arc::clone(&self.service_bindings) as Arc<dyn Lister<_>>,
            secrets: Arc::clone(&self.secrets) as Arc<dyn Lister<_>>,
        }
    }

    pub fn clients(&self) -> Clients {
        Clients {
            templated_instances: Arc::clone(&self.templated_instances) as Arc<dyn StoreClient<_>>,
            templated_bindings: Arc::clone(&self.templated_bindings) as Arc<dyn StoreClient<_>>,
            service_instances: Arc::clone(&self.service_instances) as Arc<dyn StoreClient<_>>,
            service_bindings: Arc::clone(&self.service_bindings) as Arc<dyn StoreClient<_>>,
            secrets: Arc::clone(&self.secrets) as Arc<dyn StoreClient<_>>,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::TemplatedInstanceSpec;
    use kube::api::ObjectMeta;
    use kube::ResourceExt;

    fn instance(name: &str) -> TemplatedInstance {
        let mut obj = TemplatedInstance::new(name, TemplatedInstanceSpec::default());
        obj.metadata.namespace = Some("shop".to_string());
        obj
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let store = MemoryStore::new();
        let created = store.create(&instance("orders-db")).await.unwrap();
        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(store.write_count(), 1);

        let err = store.create(&instance("orders-db")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let store = MemoryStore::new();
        let created = store.create(&instance("orders-db")).await.unwrap();

        let mut first = created.clone();
        first.spec.update_requests = 1;
        let updated = store.update(&first).await.unwrap();
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(updated.metadata.uid, created.metadata.uid);

        let mut stale = created;
        stale.spec.update_requests = 7;
        let err = store.update(&stale).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            Lister::get(&store, Some("shop"), "orders-db")
                .unwrap()
                .spec
                .update_requests,
            1
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store: MemoryStore<TemplatedInstance> = MemoryStore::new();
        let err = store.update(&instance("ghost")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_scopes_by_namespace_and_label() {
        let store = MemoryStore::new();
        store.insert(instance("a"));
        let mut other = instance("b");
        other.metadata = ObjectMeta {
            name: Some("b".to_string()),
            namespace: Some("billing".to_string()),
            labels: Some(BTreeMap::from([(
                crate::constants::SERVICE_TYPE_LABEL.to_string(),
                "redis".to_string(),
            )])),
            ..ObjectMeta::default()
        };
        store.insert(other);

        assert_eq!(store.list(None, &LabelFilter::everything()).len(), 2);
        assert_eq!(store.list(Some("shop"), &LabelFilter::everything()).len(), 1);
        let redis = store.list(None, &LabelFilter::for_service_type("redis"));
        assert_eq!(redis.len(), 1);
        assert_eq!(redis[0].name_any(), "b");
        assert_eq!(store.write_count(), 0);
    }
}
