//! Templated instance -> provisioned instance.

use crate::builder::owner::controller_reference;
use crate::crd::{ServiceInstance, ServiceInstanceSpec, TemplatedInstance};
use crate::error::{Error, Result};
use crate::template::merge::{merge_parameters, merge_parameters_from};
use crate::template::PlanDefaults;
use kube::ResourceExt;

/// Fill the instance's unset fields from a template.
///
/// - class and plan come from the template only when the instance names neither
/// - parameters merge with the instance document as the base and the template
///   document on top
/// - parameter sources are taken from the template only when the instance has none
///
/// Applying the same template twice yields the same spec.
///
/// # Errors
///
/// [`Error::MalformedParameters`] when either parameter document is not an object.
pub fn apply_instance_template(
    instance: &TemplatedInstance,
    template: &impl PlanDefaults,
) -> Result<TemplatedInstance> {
    let mut applied = instance.clone();
    let spec = &mut applied.spec;

    if spec.plan_reference.is_empty() {
        spec.plan_reference = template.plan_reference().clone();
    }
    spec.parameters = merge_parameters(instance.spec.parameters.as_ref(), template.parameters())?;
    spec.parameters_from =
        merge_parameters_from(&instance.spec.parameters_from, template.parameters_from());

    Ok(applied)
}

/// Provisioned instance for a templated instance that has had its template applied.
///
/// Same name and namespace, controlled by the templated instance.
///
/// # Errors
///
/// [`Error::PlanNotResolved`] when the instance still lacks a class or plan.
pub fn build_provisioned_instance(instance: &TemplatedInstance) -> Result<ServiceInstance> {
    if instance.requires_template() {
        return Err(Error::PlanNotResolved {
            namespace: instance.namespace().unwrap_or_default(),
            name: instance.name_any(),
        });
    }

    let mut provisioned = ServiceInstance::new(
        &instance.name_any(),
        ServiceInstanceSpec {
            plan_reference: instance.spec.plan_reference.clone(),
            parameters: instance.spec.parameters.clone(),
            parameters_from: instance.spec.parameters_from.clone(),
            external_id: instance.spec.external_id.clone(),
            update_requests: instance.spec.update_requests,
            ..ServiceInstanceSpec::default()
        },
    );
    provisioned.metadata.namespace = instance.namespace();
    provisioned.metadata.labels = instance.metadata.labels.clone();
    provisioned.metadata.owner_references = Some(vec![controller_reference(instance)]);
    Ok(provisioned)
}

/// Copy drifting fields onto an existing provisioned instance.
///
/// Plan reference, parameters, parameter sources and the update counter follow the
/// templated instance. External id and owner references stay as created.
pub fn refresh_provisioned_instance(
    instance: &TemplatedInstance,
    provisioned: &ServiceInstance,
) -> ServiceInstance {
    let mut refreshed = provisioned.clone();
    refreshed.spec.plan_reference = instance.spec.plan_reference.clone();
    refreshed.spec.parameters = instance.spec.parameters.clone();
    refreshed.spec.parameters_from = instance.spec.parameters_from.clone();
    refreshed.spec.update_requests = instance.spec.update_requests;
    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::owner::is_controlled_by;
    use crate::crd::{InstanceTemplateSpec, PlanReference, TemplatedInstanceSpec};
    use serde_json::json;

    fn instance(spec: TemplatedInstanceSpec) -> TemplatedInstance {
        let mut instance = TemplatedInstance::new("orders-db", spec);
        instance.metadata.namespace = Some("shop".to_string());
        instance.metadata.uid = Some("uid-1".to_string());
        instance
    }

    #[test]
    fn test_apply_takes_template_plan_when_unset() {
        let template = InstanceTemplateSpec {
            plan_reference: PlanReference::cluster_external("mysql", "standard"),
            parameters: Some(json!({"location": "westus"})),
            ..InstanceTemplateSpec::default()
        };
        let applied = apply_instance_template(&instance(TemplatedInstanceSpec::default()), &template)
            .unwrap();
        assert_eq!(
            applied.spec.plan_reference,
            PlanReference::cluster_external("mysql", "standard")
        );
        assert_eq!(applied.spec.parameters, Some(json!({"location": "westus"})));
    }

    #[test]
    fn test_apply_keeps_explicit_plan() {
        let template = InstanceTemplateSpec {
            plan_reference: PlanReference::cluster_external("mysql", "standard"),
            ..InstanceTemplateSpec::default()
        };
        let explicit = instance(TemplatedInstanceSpec {
            plan_reference: PlanReference::cluster_external("postgres", "basic"),
            ..TemplatedInstanceSpec::default()
        });
        let applied = apply_instance_template(&explicit, &template).unwrap();
        assert_eq!(
            applied.spec.plan_reference,
            PlanReference::cluster_external("postgres", "basic")
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let template = InstanceTemplateSpec {
            plan_reference: PlanReference::cluster_external("mysql", "standard"),
            parameters: Some(json!({"location": "westus", "firewall": {"start": "0.0.0.0"}})),
            ..InstanceTemplateSpec::default()
        };
        let original = instance(TemplatedInstanceSpec {
            parameters: Some(json!({"storageGb": 20})),
            ..TemplatedInstanceSpec::default()
        });
        let once = apply_instance_template(&original, &template).unwrap();
        let twice = apply_instance_template(&once, &template).unwrap();
        assert_eq!(once.spec, twice.spec);
    }

    #[test]
    fn test_build_requires_resolved_plan() {
        let err = build_provisioned_instance(&instance(TemplatedInstanceSpec::default())).unwrap_err();
        assert!(matches!(err, Error::PlanNotResolved { .. }));
    }

    #[test]
    fn test_build_copies_spec_and_sets_controller() {
        let templated = instance(TemplatedInstanceSpec {
            service_type: "mysqldb".to_string(),
            plan_reference: PlanReference::cluster_external("mysql", "standard"),
            parameters: Some(json!({"location": "eastus"})),
            external_id: "ext-1".to_string(),
            ..TemplatedInstanceSpec::default()
        });
        let provisioned = build_provisioned_instance(&templated).unwrap();
        assert_eq!(provisioned.name_any(), "orders-db");
        assert_eq!(provisioned.namespace().as_deref(), Some("shop"));
        assert_eq!(provisioned.spec.parameters, templated.spec.parameters);
        assert_eq!(provisioned.spec.external_id, "ext-1");
        assert!(is_controlled_by(&provisioned.metadata, &templated));
    }

    #[test]
    fn test_refresh_follows_plan_and_parameters() {
        let mut templated = instance(TemplatedInstanceSpec {
            plan_reference: PlanReference::cluster_external("mysql", "standard"),
            parameters: Some(json!({"location": "eastus"})),
            ..TemplatedInstanceSpec::default()
        });
        let provisioned = build_provisioned_instance(&templated).unwrap();

        templated.spec.parameters = Some(json!({"location": "westus"}));
        templated.spec.plan_reference = PlanReference::cluster_external("mysql", "premium");
        templated.spec.external_id = "changed".to_string();
        let refreshed = refresh_provisioned_instance(&templated, &provisioned);
        assert_eq!(refreshed.spec.parameters, Some(json!({"location": "westus"})));
        assert_eq!(
            refreshed.spec.plan_reference,
            PlanReference::cluster_external("mysql", "premium")
        );
        assert_eq!(refreshed.spec.external_id, provisioned.spec.external_id);
        assert_eq!(refreshed.metadata.owner_references, provisioned.metadata.owner_references);
    }
}
