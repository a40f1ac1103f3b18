//! # Triggers
//!
//! Mappers handed to `Controller::watches`, turning a change on a related kind into
//! the objects to reconcile.
//!
//! | Change                       | Reconciled                                          |
//! |------------------------------|-----------------------------------------------------|
//! | instance template (any tier) | every templated instance of that service type       |
//! | binding template (any tier)  | every templated binding of that service type        |
//! | `ServiceBinding`             | its `-shadow` secret, when a templated binding owns it |
//!
//! Owner-based routing (provisioned instance to templated instance, republished
//! secret to shadow secret) goes through `Controller::owns`.
//!
//! Namespaced templates only fan out within their own namespace.

use crate::builder::controller_name_of_kind;
use crate::constants::SERVICE_TYPE_LABEL;
use crate::crd::{ServiceBinding, TemplateTier, TemplatedBinding, TemplatedInstance, TieredTemplate};
use crate::store::{LabelFilter, Listers};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use tracing::{debug, trace};

/// Templated instances a changed instance template may apply to
pub fn instances_for_template<T: TieredTemplate>(
    listers: &Listers,
    template: &T,
) -> Vec<ObjectRef<TemplatedInstance>> {
    let Some(service_type) = template_service_type(template) else {
        trace!(template = %template.name_any(), "template has no service type label");
        return Vec::new();
    };
    let namespace = template_scope(template);
    let affected: Vec<_> = listers
        .templated_instances
        .list(namespace.as_deref(), &LabelFilter::everything())
        .into_iter()
        .filter(|instance| instance.spec.service_type == service_type)
        .filter_map(|instance| object_ref(&instance))
        .collect();

    debug!(
        kind = %T::kind(&()),
        template = %template.name_any(),
        service_type = %service_type,
        affected = affected.len(),
        "instance template changed"
    );
    affected
}

/// Templated bindings whose instance has the changed template's service type
pub fn bindings_for_template<T: TieredTemplate>(
    listers: &Listers,
    template: &T,
) -> Vec<ObjectRef<TemplatedBinding>> {
    let Some(service_type) = template_service_type(template) else {
        trace!(template = %template.name_any(), "template has no service type label");
        return Vec::new();
    };
    let namespace = template_scope(template);
    let affected: Vec<_> = listers
        .templated_bindings
        .list(namespace.as_deref(), &LabelFilter::everything())
        .into_iter()
        .filter(|binding| {
            listers
                .templated_instances
                .get(binding.metadata.namespace.as_deref(), &binding.spec.instance_ref.name)
                .is_some_and(|instance| instance.spec.service_type == service_type)
        })
        .filter_map(|binding| object_ref(&binding))
        .collect();

    debug!(
        kind = %T::kind(&()),
        template = %template.name_any(),
        service_type = %service_type,
        affected = affected.len(),
        "binding template changed"
    );
    affected
}

/// The secret a templated binding's provisioned binding writes.
///
/// The secret can land before its binding, so a binding change re-runs it.
pub fn shadow_secret_for_binding(binding: &ServiceBinding) -> Option<ObjectRef<Secret>> {
    controller_name_of_kind::<TemplatedBinding>(&binding.metadata)?;
    if binding.spec.secret_name.is_empty() {
        return None;
    }
    let namespace = binding.namespace()?;
    Some(ObjectRef::new(&binding.spec.secret_name).within(&namespace))
}

fn object_ref<K: Resource<DynamicType = ()>>(obj: &K) -> Option<ObjectRef<K>> {
    let namespace = obj.namespace()?;
    Some(ObjectRef::new(&obj.name_any()).within(&namespace))
}

fn template_service_type<T: TieredTemplate>(template: &T) -> Option<String> {
    template
        .labels()
        .get(SERVICE_TYPE_LABEL)
        .filter(|value| !value.is_empty())
        .cloned()
}

fn template_scope<T: TieredTemplate>(template: &T) -> Option<String> {
    match T::TIER {
        TemplateTier::Namespace => template.namespace(),
        TemplateTier::Cluster | TemplateTier::Broker => None,
    }
}
