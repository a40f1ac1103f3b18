//! # Template Tiers
//!
//! Default-value resources merged into templated resources.
//!
//! Instance and binding templates each exist at three scopes that share one payload
//! shape. Lookup goes through [`TieredTemplate`], so the resolver never cares which
//! concrete kind it is folding.
//!
//! | Tier      | Instance kind             | Binding kind             | Scope      |
//! |-----------|---------------------------|--------------------------|------------|
//! | Broker    | `BrokerInstanceTemplate`  | `BrokerBindingTemplate`  | cluster    |
//! | Cluster   | `ClusterInstanceTemplate` | `ClusterBindingTemplate` | cluster    |
//! | Namespace | `InstanceTemplate`        | `BindingTemplate`        | namespaced |
//!
//! Templates are matched to a service type by the
//! `templates.servicecatalog.k8s.io/service-type` label.

use crate::crd::common::{preserve_unknown_fields, ParametersFromSource, PlanReference};
use kube::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scope tier of a template; narrower tiers take precedence when merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateTier {
    /// Defaults published for a broker
    Broker,
    /// Cluster-wide defaults
    Cluster,
    /// Namespace defaults, final precedence
    Namespace,
}

impl TemplateTier {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateTier::Broker => "broker",
            TemplateTier::Cluster => "cluster",
            TemplateTier::Namespace => "namespace",
        }
    }
}

impl fmt::Display for TemplateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template resource at one tier, exposing its payload
pub trait TieredTemplate:
    Resource<DynamicType = ()> + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Payload shape shared by every tier of this template family
    type Payload: Clone + Default + fmt::Debug + Send + Sync;

    /// Tier this kind lives at
    const TIER: TemplateTier;

    /// Template payload
    fn payload(&self) -> &Self::Payload;
}

/// Instance template payload: plan defaults and parameters
///
/// This is also the shape of an effective (merged) instance template.
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "InstanceTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    namespaced,
    shortname = "it",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".metadata.labels.templates\\.servicecatalog\\.k8s\\.io/service-type"}, {"name":"Class", "type":"string", "jsonPath":".spec.clusterServiceClassExternalName"}, {"name":"Plan", "type":"string", "jsonPath":".spec.clusterServicePlanExternalName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplateSpec {
    /// Default class and plan
    #[serde(flatten)]
    pub plan_reference: PlanReference,
    /// Default parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Default parameter sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
}

/// Cluster-wide instance defaults
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ClusterInstanceTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    shortname = "cit"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstanceTemplateSpec {
    #[serde(flatten)]
    pub template: InstanceTemplateSpec,
}

/// Instance defaults published for one broker
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "BrokerInstanceTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    shortname = "bit",
    printcolumn = r#"{"name":"Broker", "type":"string", "jsonPath":".spec.brokerName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BrokerInstanceTemplateSpec {
    /// Broker that publishes these defaults
    pub broker_name: String,
    #[serde(flatten)]
    pub template: InstanceTemplateSpec,
}

/// Binding template payload: parameters and secret key renames
///
/// This is also the shape of an effective (merged) binding template.
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "BindingTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    namespaced,
    shortname = "bt"
)]
#[serde(rename_all = "camelCase")]
pub struct BindingTemplateSpec {
    /// Default parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub parameters: Option<serde_json::Value>,
    /// Default parameter sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_from: Vec<ParametersFromSource>,
    /// Default credential key renames: provisioned key -> desired key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_keys: BTreeMap<String, String>,
}

/// Cluster-wide binding defaults
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ClusterBindingTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    shortname = "cbt"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBindingTemplateSpec {
    #[serde(flatten)]
    pub template: BindingTemplateSpec,
}

/// Binding defaults published for one broker
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "BrokerBindingTemplate",
    group = "templates.servicecatalog.k8s.io",
    version = "v1alpha1",
    shortname = "bbt"
)]
#[serde(rename_all = "camelCase")]
pub struct BrokerBindingTemplateSpec {
    /// Broker that publishes these defaults
    pub broker_name: String,
    #[serde(flatten)]
    pub template: BindingTemplateSpec,
}

impl TieredTemplate for InstanceTemplate {
    type Payload = InstanceTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Namespace;

    fn payload(&self) -> &InstanceTemplateSpec {
        &self.spec
    }
}

impl TieredTemplate for ClusterInstanceTemplate {
    type Payload = InstanceTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Cluster;

    fn payload(&self) -> &InstanceTemplateSpec {
        &self.spec.template
    }
}

impl TieredTemplate for BrokerInstanceTemplate {
    type Payload = InstanceTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Broker;

    fn payload(&self) -> &InstanceTemplateSpec {
        &self.spec.template
    }
}

impl TieredTemplate for BindingTemplate {
    type Payload = BindingTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Namespace;

    fn payload(&self) -> &BindingTemplateSpec {
        &self.spec
    }
}

impl TieredTemplate for ClusterBindingTemplate {
    type Payload = BindingTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Cluster;

    fn payload(&self) -> &BindingTemplateSpec {
        &self.spec.template
    }
}

impl TieredTemplate for BrokerBindingTemplate {
    type Payload = BindingTemplateSpec;
    const TIER: TemplateTier = TemplateTier::Broker;

    fn payload(&self) -> &BindingTemplateSpec {
        &self.spec.template
    }
}
