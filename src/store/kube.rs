//! # Kubernetes Store
//!
//! [`Lister`] over a reflector store and [`StoreClient`] over `kube::Api`.

use crate::error::{Error, Result};
use crate::store::{in_scope, Clients, LabelFilter, Lister, StoreClient};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Lister serving reads from a reflector store
pub struct CachedLister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    store: Store<K>,
}

impl<K> CachedLister<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }
}

impl<K> Lister<K> for CachedLister<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        let mut reference = ObjectRef::new(name);
        if let Some(namespace) = namespace {
            reference = reference.within(namespace);
        }
        self.store.get(&reference).map(|obj| (*obj).clone())
    }

    fn list(&self, namespace: Option<&str>, filter: &LabelFilter) -> Vec<K> {
        self.store
            .state()
            .into_iter()
            .filter(|obj| in_scope(obj.meta(), namespace, filter))
            .map(|obj| (*obj).clone())
            .collect()
    }
}

/// Client writing straight to the API server
pub struct ApiClient<K> {
    client: Client,
    field_manager: String,
    kind: PhantomData<fn() -> K>,
}

impl<K> ApiClient<K> {
    pub fn new(client: Client, field_manager: &str) -> Self {
        Self {
            client,
            field_manager: field_manager.to_string(),
            kind: PhantomData,
        }
    }
}

impl<K> ApiClient<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn api_for(&self, obj: &K) -> Api<K> {
        self.api(obj.meta().namespace.as_deref().unwrap_or("default"))
    }
}

#[async_trait]
impl<K> StoreClient<K> for ApiClient<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify::<K>(e, name))
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        debug!(kind = %K::kind(&()), name = %name, "creating");
        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        self.api_for(obj)
            .create(&params, obj)
            .await
            .map_err(|e| classify::<K>(e, &name))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        debug!(kind = %K::kind(&()), name = %name, "replacing");
        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        self.api_for(obj)
            .replace(&name, &params, obj)
            .await
            .map_err(|e| classify::<K>(e, &name))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        let serialized = serde_json::to_value(obj)?;
        let mut patch = json!({
            "status": serialized.get("status").cloned().unwrap_or_default(),
        });
        // resourceVersion in a merge patch acts as a precondition
        if let Some(version) = &obj.meta().resource_version {
            patch["metadata"] = json!({ "resourceVersion": version });
        }
        self.api_for(obj)
            .patch_status(&name, &PatchParams::apply(&self.field_manager), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify::<K>(e, &name))
    }
}

/// Map API status codes onto the controller's error vocabulary
fn classify<K: Resource<DynamicType = ()>>(error: kube::Error, name: &str) -> Error {
    let kind = K::kind(&()).to_string();
    match &error {
        kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists" => {
            Error::AlreadyExists {
                kind,
                name: name.to_string(),
            }
        }
        kube::Error::Api(response) if response.code == 409 => Error::Conflict {
            kind,
            name: name.to_string(),
            message: response.message.clone(),
        },
        kube::Error::Api(response) if response.code == 404 => Error::NotFound {
            kind,
            name: name.to_string(),
        },
        _ => Error::Kube(error),
    }
}

impl Clients {
    /// Clients for every written kind, backed by the API server
    pub fn kube(client: &Client, field_manager: &str) -> Self {
        Self {
            templated_instances: Arc::new(ApiClient::new(client.clone(), field_manager)),
            templated_bindings: Arc::new(ApiClient::new(client.clone(), field_manager)),
            service_instances: Arc::new(ApiClient::new(client.clone(), field_manager)),
            service_bindings: Arc::new(ApiClient::new(client.clone(), field_manager)),
            secrets: Arc::new(ApiClient::new(client.clone(), field_manager)),
        }
    }
}
