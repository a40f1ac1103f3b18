//! # Templated Resources
//!
//! User-facing requests that may omit provisioning details to be filled in by templates.

use crate::crd::common::{
    preserve_unknown_fields, ClusterObjectReference, Condition, LocalObjectReference,
    ParametersFromSource, PlanReference, PlanSelector,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TemplatedInstance Custom Resource Definition
///
/// Requests a service instance by service type. Class, plan and parameters left
/// unset are filled in from instance templates.
///
/// # Example
///
/// ```yaml
/// apiVersion: templates.servicecatalog.k8s.io/v1alpha1
/// kind: TemplatedInstance
/// metadata:
///   name: orders-db
///   namespace: shop
/// spec:
///   serviceType: mysqldb
///   parameters:
///     storageGb: 20
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "TemplatedInstance",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    namespaced,
    status = "TemplatedInstanceStatus",
    shortname = "ti",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.serviceType"}, {"name":"Class", "type":"string", "jsonPath":".spec.clusterServiceClassExternalName"}, {"name":"Plan", "type":"string", "jsonPath":".spec.clusterServicePlanExternalName"}, {"name":"Status", "type":"string", "jsonPath":".status.provisionStatus"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedInstanceSpec {
    /// Service type used to select templates, e.g. "mysqldb"
    #[serde(default)]
    pub service_type: String,
    /// Declarative plan filter used instead of a literal class/plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_selector: Option<PlanSelector>,
    /// Explicit class and plan; fields left unset are taken from templates
    #[serde(flatten)]
    pub plan_reference: PlanReference,
    /// Provisioning parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Parameters sourced from secrets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
    /// Identifier passed to the broker; immutable once set
    #[serde(default, rename = "externalID")]
    pub external_id: String,
    /// Incremented to force the broker to re-evaluate the instance
    #[serde(default)]
    pub update_requests: i64,
}

/// Status of a TemplatedInstance
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedInstanceStatus {
    /// Class the catalog resolved for the provisioned instance
    #[serde(default)]
    pub class_ref: Option<ClusterObjectReference>,
    /// Plan the catalog resolved for the provisioned instance
    #[serde(default)]
    pub plan_ref: Option<ClusterObjectReference>,
    /// Provision status reported by the catalog
    #[serde(default)]
    pub provision_status: Option<String>,
    /// Conditions copied from the provisioned instance
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether the provisioned instance matches this resource
    #[serde(default)]
    pub synced: bool,
    /// Last successful synchronization (RFC3339)
    #[serde(default)]
    pub last_sync_time: Option<String>,
}

impl TemplatedInstanceStatus {
    /// Equal apart from the sync timestamp
    pub fn same_observation(&self, other: &Self) -> bool {
        self.class_ref == other.class_ref
            && self.plan_ref == other.plan_ref
            && self.provision_status == other.provision_status
            && self.conditions == other.conditions
            && self.synced == other.synced
    }
}

impl TemplatedInstance {
    /// Whether templates are still needed to pick a class and plan.
    ///
    /// False once the instance names both a class and a plan.
    pub fn requires_template(&self) -> bool {
        !self.spec.plan_reference.is_complete()
    }
}

/// TemplatedBinding Custom Resource Definition
///
/// Requests credentials for a TemplatedInstance. Parameters and secret key
/// renames left unset are filled in from binding templates.
///
/// # Example
///
/// ```yaml
/// apiVersion: templates.servicecatalog.k8s.io/v1alpha1
/// kind: TemplatedBinding
/// metadata:
///   name: orders-db-creds
///   namespace: shop
/// spec:
///   instanceRef:
///     name: orders-db
///   secretName: orders-db
///   secretKeys:
///     password: db-password
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "TemplatedBinding",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    namespaced,
    status = "TemplatedBindingStatus",
    shortname = "tb",
    printcolumn = r#"{"name":"Instance", "type":"string", "jsonPath":".spec.instanceRef.name"}, {"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}, {"name":"Synced", "type":"boolean", "jsonPath":".status.synced"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedBindingSpec {
    /// TemplatedInstance being bound; immutable
    pub instance_ref: LocalObjectReference,
    /// Binding parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Parameters sourced from secrets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
    /// Renames credential keys: provisioned key -> desired key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_keys: BTreeMap<String, String>,
    /// Name of the secret that receives the credentials
    #[serde(default)]
    pub secret_name: String,
    /// Identifier passed to the broker; immutable once set
    #[serde(default, rename = "externalID")]
    pub external_id: String,
}

/// Status of a TemplatedBinding
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedBindingStatus {
    /// Conditions copied from the provisioned binding
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Secret the credentials are published to
    #[serde(default)]
    pub secret_name: Option<String>,
    /// Whether the provisioned binding matches this resource
    #[serde(default)]
    pub synced: bool,
    /// Last successful synchronization (RFC3339)
    #[serde(default)]
    pub last_sync_time: Option<String>,
}

impl TemplatedBindingStatus {
    /// Equal apart from the sync timestamp
    pub fn same_observation(&self, other: &Self) -> bool {
        self.conditions == other.conditions
            && self.secret_name == other.secret_name
            && self.synced == other.synced
    }
}
