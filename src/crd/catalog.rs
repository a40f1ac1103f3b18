//! # Service Catalog Resources
//!
//! Provisioning resources of the service catalog API (`servicecatalog.k8s.io/v1beta1`).
//!
//! These CRDs are installed and reconciled by the service catalog itself. Only the
//! fields this controller reads or writes are modelled; `crdgen` does not emit them.

use crate::crd::common::{
    preserve_unknown_fields, ClusterObjectReference, Condition, LocalObjectReference,
    ParametersFromSource, PlanReference,
};
use serde::{Deserialize, Serialize};

/// ServiceInstance: a provisioned service
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ServiceInstance",
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    namespaced,
    status = "ServiceInstanceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    /// Requested class and plan
    #[serde(flatten)]
    pub plan_reference: PlanReference,
    /// Class resolved by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_ref: Option<ClusterObjectReference>,
    /// Plan resolved by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_ref: Option<ClusterObjectReference>,
    /// Provisioning parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Parameters sourced from secrets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
    /// Identifier passed to the broker
    #[serde(default, rename = "externalID")]
    pub external_id: String,
    /// Incremented to force re-evaluation by the broker
    #[serde(default)]
    pub update_requests: i64,
}

/// Status of a ServiceInstance as reported by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceStatus {
    /// Catalog conditions (Ready, Failed, ...)
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Provisioned, NotProvisioned, ...
    #[serde(default)]
    pub provision_status: Option<String>,
    /// Whether a broker operation is running
    #[serde(default)]
    pub async_op_in_progress: bool,
    /// Dashboard URL returned by the broker
    #[serde(default, rename = "dashboardURL")]
    pub dashboard_url: Option<String>,
}

/// ServiceBinding: credentials for a provisioned service
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ServiceBinding",
    group = "servicecatalog.k8s.io",
    version = "v1beta1",
    namespaced,
    status = "ServiceBindingStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingSpec {
    /// ServiceInstance being bound
    pub instance_ref: LocalObjectReference,
    /// Binding parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Parameters sourced from secrets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
    /// Secret the catalog writes credentials to
    #[serde(default)]
    pub secret_name: String,
    /// Identifier passed to the broker
    #[serde(default, rename = "externalID")]
    pub external_id: String,
}

/// Status of a ServiceBinding as reported by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    /// Catalog conditions (Ready, Failed, ...)
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether a broker operation is running
    #[serde(default)]
    pub async_op_in_progress: bool,
}
