//! # Custom Resource Definitions
//!
//! CRD types for the templates controller.
//!
//! ## Module Structure
//!
//! - `common.rs` - Plan references, parameter sources, conditions
//! - `templated.rs` - TemplatedInstance and TemplatedBinding
//! - `templates.rs` - The three tiers of instance and binding templates
//! - `catalog.rs` - Service catalog ServiceInstance and ServiceBinding

mod catalog;
mod common;
mod templated;
mod templates;

// Re-export all public types
pub use catalog::{
    ServiceBinding, ServiceBindingSpec, ServiceBindingStatus, ServiceInstance,
    ServiceInstanceSpec, ServiceInstanceStatus,
};
pub(crate) use common::is_set;
pub use common::{
    preserve_unknown_fields, ClusterObjectReference, Condition, LocalObjectReference,
    ParametersFromSource, PlanReference, PlanSelector, SecretKeyReference,
};
pub use templated::{
    TemplatedBinding, TemplatedBindingSpec, TemplatedBindingStatus, TemplatedInstance,
    TemplatedInstanceSpec, TemplatedInstanceStatus,
};
pub use templates::{
    BindingTemplate, BindingTemplateSpec, BrokerBindingTemplate, BrokerBindingTemplateSpec,
    BrokerInstanceTemplate, BrokerInstanceTemplateSpec, ClusterBindingTemplate,
    ClusterBindingTemplateSpec, ClusterInstanceTemplate, ClusterInstanceTemplateSpec,
    InstanceTemplate, InstanceTemplateSpec, TemplateTier, TieredTemplate,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{SERVICE_CATALOG_GROUP, TEMPLATES_GROUP};
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn test_api_groups() {
        assert_eq!(TemplatedInstance::group(&()), TEMPLATES_GROUP);
        assert_eq!(BrokerBindingTemplate::group(&()), TEMPLATES_GROUP);
        assert_eq!(ServiceInstance::group(&()), SERVICE_CATALOG_GROUP);
        assert_eq!(ServiceBinding::group(&()), SERVICE_CATALOG_GROUP);
    }

    #[test]
    fn test_scopes() {
        assert_eq!(InstanceTemplate::crd().spec.scope, "Namespaced");
        assert_eq!(ClusterInstanceTemplate::crd().spec.scope, "Cluster");
        assert_eq!(BrokerInstanceTemplate::crd().spec.scope, "Cluster");
        assert_eq!(TemplatedBinding::crd().spec.scope, "Namespaced");
    }
}
