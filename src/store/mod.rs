//! # Stores
//!
//! Narrow interfaces to the resource store.
//!
//! Reads on the hot path go through a [`Lister`], served from a locally
//! maintained, eventually consistent cache. Writes always go through a
//! [`StoreClient`] talking to the API server directly.
//!
//! - `kube.rs` - reflector-backed listers and `kube::Api`-backed clients
//! - `memory.rs` - in-memory store with optimistic concurrency
//! - `cache.rs` - the read-through cache and its watch tasks

pub mod cache;
pub mod kube;
pub mod memory;

use crate::constants::SERVICE_TYPE_LABEL;
use crate::crd::{
    BindingTemplate, BrokerBindingTemplate, BrokerInstanceTemplate, ClusterBindingTemplate,
    ClusterInstanceTemplate, InstanceTemplate, ServiceBinding, ServiceInstance, TemplatedBinding,
    TemplatedInstance,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Selects resources tagged with a service type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter {
    service_type: Option<String>,
}

impl LabelFilter {
    /// Filter for a service type; an empty service type matches everything
    pub fn for_service_type(service_type: &str) -> Self {
        if service_type.is_empty() {
            Self::everything()
        } else {
            Self {
                service_type: Some(service_type.to_string()),
            }
        }
    }

    /// Filter that matches every resource
    pub fn everything() -> Self {
        Self { service_type: None }
    }

    /// Whether a label set passes the filter
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        match &self.service_type {
            None => true,
            Some(wanted) => labels
                .and_then(|labels| labels.get(SERVICE_TYPE_LABEL))
                .is_some_and(|value| value == wanted),
        }
    }

    /// Label selector string for list calls, `None` when unfiltered
    pub fn to_selector(&self) -> Option<String> {
        self.service_type
            .as_ref()
            .map(|service_type| format!("{SERVICE_TYPE_LABEL}={service_type}"))
    }
}

/// Whether an object is in scope for a namespaced list with a label filter
pub(crate) fn in_scope(meta: &ObjectMeta, namespace: Option<&str>, filter: &LabelFilter) -> bool {
    namespace.is_none_or(|ns| meta.namespace.as_deref() == Some(ns))
        && filter.matches(meta.labels.as_ref())
}

/// Queue key of an object: `namespace/name`, or `name` for cluster-scoped objects
pub fn object_key(meta: &ObjectMeta) -> String {
    let name = meta.name.as_deref().unwrap_or_default();
    match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => format!("{ns}/{name}"),
        _ => name.to_string(),
    }
}

/// Split a `namespace/name` object key
///
/// # Errors
///
/// [`Error::InvalidKey`] unless the key has exactly one `/` with text on both sides.
pub fn split_key(key: &str) -> Result<(String, String)> {
    match key.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((namespace.to_string(), name.to_string()))
        }
        _ => Err(Error::InvalidKey(key.to_string())),
    }
}

/// Cached read access to one resource kind
pub trait Lister<K>: Send + Sync {
    /// Get one object; `namespace` is `None` for cluster-scoped kinds
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<K>;

    /// List objects in a namespace (or everywhere) that pass the filter
    fn list(&self, namespace: Option<&str>, filter: &LabelFilter) -> Vec<K>;
}

/// Direct read/write access to one namespaced resource kind
#[async_trait]
pub trait StoreClient<K>: Send + Sync {
    /// Uncached read
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create the object
    async fn create(&self, obj: &K) -> Result<K>;

    /// Replace the object; fails with a conflict when its resource version is stale
    async fn update(&self, obj: &K) -> Result<K>;

    /// Write the status block of the object
    async fn update_status(&self, obj: &K) -> Result<K>;
}

/// Cached readers for every kind the controller looks at
#[derive(Clone)]
pub struct Listers {
    pub templated_instances: Arc<dyn Lister<TemplatedInstance>>,
    pub templated_bindings: Arc<dyn Lister<TemplatedBinding>>,
    pub instance_templates: Arc<dyn Lister<InstanceTemplate>>,
    pub cluster_instance_templates: Arc<dyn Lister<ClusterInstanceTemplate>>,
    pub broker_instance_templates: Arc<dyn Lister<BrokerInstanceTemplate>>,
    pub binding_templates: Arc<dyn Lister<BindingTemplate>>,
    pub cluster_binding_templates: Arc<dyn Lister<ClusterBindingTemplate>>,
    pub broker_binding_templates: Arc<dyn Lister<BrokerBindingTemplate>>,
    pub service_instances: Arc<dyn Lister<ServiceInstance>>,
    pub service_bindings: Arc<dyn Lister<ServiceBinding>>,
    pub secrets: Arc<dyn Lister<Secret>>,
}

impl std::fmt::Debug for Listers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listers").finish_non_exhaustive()
    }
}

/// Direct clients for every kind the controller writes
#[derive(Clone)]
pub struct Clients {
    pub templated_instances: Arc<dyn StoreClient<TemplatedInstance>>,
    pub templated_bindings: Arc<dyn StoreClient<TemplatedBinding>>,
    pub service_instances: Arc<dyn StoreClient<ServiceInstance>>,
    pub service_bindings: Arc<dyn StoreClient<ServiceBinding>>,
    pub secrets: Arc<dyn StoreClient<Secret>>,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}
