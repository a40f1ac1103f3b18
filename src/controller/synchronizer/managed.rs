//! Ownership chain lookups.
//!
//! A secret is ours when its controller is a templated resource, or a service
//! binding whose own controller is a templated binding. The two hops are
//! resolved explicitly against the cache.

use crate::builder::{controller_name_of_kind, controller_of};
use crate::crd::{ServiceBinding, TemplatedBinding, TemplatedInstance};
use crate::store::Listers;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

/// Whether the object described by `meta` is managed by this controller
pub fn is_managed(listers: &Listers, meta: &ObjectMeta) -> bool {
    let Some(owner) = controller_of(meta) else {
        return false;
    };
    if owner.kind == TemplatedInstance::kind(&()) || owner.kind == TemplatedBinding::kind(&()) {
        return true;
    }
    if owner.kind != ServiceBinding::kind(&()) {
        return false;
    }
    listers
        .service_bindings
        .get(meta.namespace.as_deref(), &owner.name)
        .is_some_and(|binding| controller_name_of_kind::<TemplatedBinding>(&binding.metadata).is_some())
}

/// The templated binding at the end of `secret -> service binding -> templated binding`.
///
/// `None` when either hop is missing from the cache or controlled by something else.
pub fn managed_binding_for_secret(listers: &Listers, secret: &Secret) -> Option<TemplatedBinding> {
    let namespace = secret.namespace();
    let service_binding_name = controller_name_of_kind::<ServiceBinding>(&secret.metadata)?;
    let service_binding = listers
        .service_bindings
        .get(namespace.as_deref(), service_binding_name)?;
    let templated_name = controller_name_of_kind::<TemplatedBinding>(&service_binding.metadata)?;
    listers
        .templated_bindings
        .get(namespace.as_deref(), templated_name)
}
