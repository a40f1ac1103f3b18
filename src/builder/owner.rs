//! Controller owner references.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

/// Owner reference marking `owner` as the controller of a dependent object
pub fn controller_reference<K: Resource<DynamicType = ()>>(owner: &K) -> OwnerReference {
    OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: owner.name_any(),
        uid: owner.meta().uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// The owner reference flagged as controller, if any
pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|reference| reference.controller == Some(true))
}

/// Whether `meta`'s controller is `owner`.
///
/// Matches on kind and name, and on uid when both sides carry one.
pub fn is_controlled_by<K: Resource<DynamicType = ()>>(meta: &ObjectMeta, owner: &K) -> bool {
    controller_of(meta).is_some_and(|reference| {
        reference.kind == K::kind(&())
            && owner.meta().name.as_deref() == Some(reference.name.as_str())
            && match owner.meta().uid.as_deref() {
                Some(uid) if !reference.uid.is_empty() => reference.uid == uid,
                _ => true,
            }
    })
}

/// Whether `meta`'s controller has the kind of `K`, returning its name
pub fn controller_name_of_kind<K: Resource<DynamicType = ()>>(meta: &ObjectMeta) -> Option<&str> {
    controller_of(meta)
        .filter(|reference| reference.kind == K::kind(&()))
        .map(|reference| reference.name.as_str())
}
