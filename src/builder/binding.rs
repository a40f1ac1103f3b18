//! Templated binding -> provisioned binding.

use crate::builder::owner::controller_reference;
use crate::builder::secret::shadow_secret_name;
use crate::crd::{LocalObjectReference, ServiceBinding, ServiceBindingSpec, TemplatedBinding};
use crate::error::Result;
use crate::template::merge::{merge_parameters, merge_parameters_from, merge_secret_keys};
use crate::template::SecretKeyDefaults;
use kube::ResourceExt;

/// Fill the binding's unset fields from a template.
///
/// The secret name defaults to the bound instance's name.
///
/// The two merges run in opposite directions: parameters take the template as the
/// overlay (template keys win), secret key renames take the binding as the overlay
/// (the binding's own renames win).
///
/// # Errors
///
/// [`crate::Error::MalformedParameters`] when either parameter document is not an object.
pub fn apply_binding_template(
    binding: &TemplatedBinding,
    template: &impl SecretKeyDefaults,
) -> Result<TemplatedBinding> {
    let mut applied = binding.clone();
    let spec = &mut applied.spec;

    if spec.secret_name.is_empty() {
        spec.secret_name.clone_from(&binding.spec.instance_ref.name);
    }
    spec.parameters = merge_parameters(binding.spec.parameters.as_ref(), template.parameters())?;
    spec.parameters_from =
        merge_parameters_from(&binding.spec.parameters_from, template.parameters_from());
    spec.secret_keys = merge_secret_keys(template.secret_keys(), &binding.spec.secret_keys);

    Ok(applied)
}

/// Provisioned binding for a templated binding.
///
/// The catalog writes credentials to the shadow of the desired secret name; the
/// secret synchronizer republishes them under the desired name.
pub fn build_provisioned_binding(binding: &TemplatedBinding) -> ServiceBinding {
    let mut provisioned = ServiceBinding::new(
        &binding.name_any(),
        ServiceBindingSpec {
            instance_ref: LocalObjectReference {
                name: binding.spec.instance_ref.name.clone(),
            },
            parameters: binding.spec.parameters.clone(),
            parameters_from: binding.spec.parameters_from.clone(),
            secret_name: shadow_secret_name(&binding.spec.secret_name),
            external_id: binding.spec.external_id.clone(),
        },
    );
    provisioned.metadata.namespace = binding.namespace();
    provisioned.metadata.labels = binding.metadata.labels.clone();
    provisioned.metadata.owner_references = Some(vec![controller_reference(binding)]);
    provisioned
}

/// Copy drifting fields onto an existing provisioned binding
pub fn refresh_provisioned_binding(
    binding: &TemplatedBinding,
    provisioned: &ServiceBinding,
) -> ServiceBinding {
    let mut refreshed = provisioned.clone();
    refreshed.spec.parameters = binding.spec.parameters.clone();
    refreshed.spec.parameters_from = binding.spec.parameters_from.clone();
    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::owner::is_controlled_by;
    use crate::crd::{BindingTemplateSpec, TemplatedBindingSpec};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn binding(spec: TemplatedBindingSpec) -> TemplatedBinding {
        let mut binding = TemplatedBinding::new("orders-db-creds", spec);
        binding.metadata.namespace = Some("shop".to_string());
        binding.metadata.uid = Some("uid-2".to_string());
        binding
    }

    fn bound_to(instance: &str) -> TemplatedBindingSpec {
        TemplatedBindingSpec {
            instance_ref: LocalObjectReference {
                name: instance.to_string(),
            },
            ..TemplatedBindingSpec::default()
        }
    }

    #[test]
    fn test_apply_defaults_secret_name_to_instance() {
        let applied = apply_binding_template(&binding(bound_to("orders-db")), &BindingTemplateSpec::default())
            .unwrap();
        assert_eq!(applied.spec.secret_name, "orders-db");

        let mut named = bound_to("orders-db");
        named.secret_name = "orders-creds".to_string();
        let applied = apply_binding_template(&binding(named), &BindingTemplateSpec::default()).unwrap();
        assert_eq!(applied.spec.secret_name, "orders-creds");
    }

    #[test]
    fn test_apply_merges_secret_keys_binding_wins() {
        let template = BindingTemplateSpec {
            secret_keys: BTreeMap::from([
                ("password".to_string(), "pw".to_string()),
                ("host".to_string(), "hostname".to_string()),
            ]),
            parameters: Some(json!({"role": "reader"})),
            ..BindingTemplateSpec::default()
        };
        let mut spec = bound_to("orders-db");
        spec.secret_keys = BTreeMap::from([("password".to_string(), "db-password".to_string())]);

        let applied = apply_binding_template(&binding(spec), &template).unwrap();
        assert_eq!(applied.spec.secret_keys["password"], "db-password");
        assert_eq!(applied.spec.secret_keys["host"], "hostname");
        assert_eq!(applied.spec.parameters, Some(json!({"role": "reader"})));
    }

    #[test]
    fn test_build_writes_to_shadow_secret() {
        let mut spec = bound_to("orders-db");
        spec.secret_name = "orders-creds".to_string();
        let templated = binding(spec);

        let provisioned = build_provisioned_binding(&templated);
        assert_eq!(provisioned.spec.secret_name, "orders-creds-shadow");
        assert_eq!(provisioned.spec.instance_ref.name, "orders-db");
        assert_eq!(provisioned.namespace().as_deref(), Some("shop"));
        assert!(is_controlled_by(&provisioned.metadata, &templated));
    }

    #[test]
    fn test_refresh_keeps_secret_name() {
        let mut spec = bound_to("orders-db");
        spec.secret_name = "orders-creds".to_string();
        let mut templated = binding(spec);
        let provisioned = build_provisioned_binding(&templated);

        templated.spec.parameters = Some(json!({"role": "writer"}));
        let refreshed = refresh_provisioned_binding(&templated, &provisioned);
        assert_eq!(refreshed.spec.parameters, Some(json!({"role": "writer"})));
        assert_eq!(refreshed.spec.secret_name, "orders-creds-shadow");
    }
}
