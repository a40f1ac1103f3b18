//! # Shared CRD Types
//!
//! Field types shared by templated, template and provisioned resources.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Schema for opaque parameter payloads
///
/// Parameters are free-form JSON; the API server must keep unknown fields.
pub fn preserve_unknown_fields(_generator: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Reference to a service class and plan, by name or by external name
///
/// Mirrors the plan reference embedded in a service catalog instance spec.
/// Cluster-scoped and namespaced class/plan identifiers are both supported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanReference {
    /// External name of a cluster-scoped service class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_external_name: Option<String>,
    /// External name of a cluster-scoped service plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_external_name: Option<String>,
    /// Kubernetes name of a cluster-scoped service class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_class_name: Option<String>,
    /// Kubernetes name of a cluster-scoped service plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_service_plan_name: Option<String>,
    /// External name of a namespaced service class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_class_external_name: Option<String>,
    /// External name of a namespaced service plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_external_name: Option<String>,
    /// Kubernetes name of a namespaced service class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_class_name: Option<String>,
    /// Kubernetes name of a namespaced service plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan_name: Option<String>,
}

impl PlanReference {
    /// Reference a cluster class and plan by external name
    pub fn cluster_external(class: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            cluster_service_class_external_name: Some(class.into()),
            cluster_service_plan_external_name: Some(plan.into()),
            ..Self::default()
        }
    }

    /// Whether any class identifier is set
    pub fn class_specified(&self) -> bool {
        [
            &self.cluster_service_class_external_name,
            &self.cluster_service_class_name,
            &self.service_class_external_name,
            &self.service_class_name,
        ]
        .into_iter()
        .any(is_set)
    }

    /// Whether any plan identifier is set
    pub fn plan_specified(&self) -> bool {
        [
            &self.cluster_service_plan_external_name,
            &self.cluster_service_plan_name,
            &self.service_plan_external_name,
            &self.service_plan_name,
        ]
        .into_iter()
        .any(is_set)
    }

    /// Neither class nor plan set
    pub fn is_empty(&self) -> bool {
        !self.class_specified() && !self.plan_specified()
    }

    /// Both class and plan set
    pub fn is_complete(&self) -> bool {
        self.class_specified() && self.plan_specified()
    }

    /// Human-readable `class/plan` pair, for logs
    pub fn describe(&self) -> String {
        let class = first_set(&[
            &self.cluster_service_class_external_name,
            &self.cluster_service_class_name,
            &self.service_class_external_name,
            &self.service_class_name,
        ]);
        let plan = first_set(&[
            &self.cluster_service_plan_external_name,
            &self.cluster_service_plan_name,
            &self.service_plan_external_name,
            &self.service_plan_name,
        ]);
        format!("{}/{}", class.unwrap_or("-"), plan.unwrap_or("-"))
    }
}

/// Whether an optional identifier holds a non-empty value
pub(crate) fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn first_set<'a>(values: &[&'a Option<String>]) -> Option<&'a str> {
    values
        .iter()
        .copied()
        .find(|v| is_set(v))
        .and_then(|v| v.as_deref())
}

/// Indirection to a parameter value held in a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParametersFromSource {
    /// Secret key whose value is a JSON object of parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyReference>,
}

/// Reference to one key of a secret in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyReference {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Reference to an object in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    /// Object name
    pub name: String,
}

/// Reference to a cluster-scoped object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterObjectReference {
    /// Object name
    pub name: String,
}

/// Condition represents a status condition for the resource
///
/// Conditions reported by the service catalog are copied onto templated resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}

/// Declarative plan filter used instead of a literal class/plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanSelector {
    /// Labels a candidate plan must carry
    #[serde(default)]
    pub match_labels: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_reference_specified_checks() {
        let empty = PlanReference::default();
        assert!(empty.is_empty());
        assert!(!empty.is_complete());

        let class_only = PlanReference {
            service_class_name: Some("abc123".to_string()),
            ..PlanReference::default()
        };
        assert!(class_only.class_specified());
        assert!(!class_only.plan_specified());
        assert!(!class_only.is_empty());

        let full = PlanReference::cluster_external("mysql-class", "free-plan");
        assert!(full.is_complete());
        assert_eq!(full.describe(), "mysql-class/free-plan");
    }

    #[test]
    fn test_empty_strings_do_not_count() {
        let blank = PlanReference {
            cluster_service_class_external_name: Some(String::new()),
            cluster_service_plan_external_name: Some(String::new()),
            ..PlanReference::default()
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn test_plan_reference_flattened_field_names() {
        let json = serde_json::to_value(PlanReference::cluster_external("c", "p")).unwrap();
        assert_eq!(json["clusterServiceClassExternalName"], "c");
        assert_eq!(json["clusterServicePlanExternalName"], "p");
        assert!(json.get("serviceClassName").is_none());
    }
}
