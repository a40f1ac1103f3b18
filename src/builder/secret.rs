//! # Credential Secrets
//!
//! The provisioned binding writes credentials to `<name>-shadow`. The controller
//! republishes them as the shadow secret proper, named `<name>`, with keys
//! renamed per the templated binding's `secretKeys`. The republished secret is
//! controlled by the provisioned one, so it goes away with it.

use crate::builder::owner::controller_reference;
use crate::constants::SHADOW_SECRET_SUFFIX;
use crate::crd::TemplatedBinding;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Name of the secret the provisioned binding writes for a desired secret name
pub fn shadow_secret_name(name: &str) -> String {
    format!("{name}{SHADOW_SECRET_SUFFIX}")
}

/// Desired secret name for a provisioned binding's secret, if `name` has the suffix
pub fn bound_secret_name(name: &str) -> Option<&str> {
    name.strip_suffix(SHADOW_SECRET_SUFFIX)
        .filter(|bound| !bound.is_empty())
}

/// Rename keys per `renames` (provisioned key -> desired key); other keys pass through
pub fn rekey_secret_data(
    data: &BTreeMap<String, ByteString>,
    renames: &BTreeMap<String, String>,
) -> BTreeMap<String, ByteString> {
    data.iter()
        .map(|(key, value)| {
            let key = renames.get(key).unwrap_or(key);
            (key.clone(), value.clone())
        })
        .collect()
}

fn rekeyed(provisioned: &Secret, binding: &TemplatedBinding) -> BTreeMap<String, ByteString> {
    rekey_secret_data(
        provisioned.data.as_ref().unwrap_or(&BTreeMap::new()),
        &binding.spec.secret_keys,
    )
}

/// User-facing copy of a provisioned binding's secret.
///
/// `None` when the provisioned secret name does not carry the shadow suffix.
pub fn build_shadow_secret(provisioned: &Secret, binding: &TemplatedBinding) -> Option<Secret> {
    let name = bound_secret_name(provisioned.metadata.name.as_deref()?)?;

    let mut secret = Secret {
        data: Some(rekeyed(provisioned, binding)),
        type_: provisioned.type_.clone(),
        ..Secret::default()
    };
    secret.metadata.name = Some(name.to_string());
    secret.metadata.namespace = provisioned.namespace();
    secret.metadata.labels = binding.metadata.labels.clone();
    secret.metadata.owner_references = Some(vec![controller_reference(provisioned)]);
    Some(secret)
}

/// Updated copy of `existing` when its data no longer matches the provisioned secret
pub fn refresh_shadow_secret(
    provisioned: &Secret,
    binding: &TemplatedBinding,
    existing: &Secret,
) -> Option<Secret> {
    let desired = rekeyed(provisioned, binding);
    let current = existing.data.clone().unwrap_or_default();
    if current == desired && existing.type_ == provisioned.type_ {
        return None;
    }

    let mut refreshed = existing.clone();
    refreshed.data = Some(desired);
    refreshed.type_.clone_from(&provisioned.type_);
    Some(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::owner::is_controlled_by;
    use crate::crd::TemplatedBindingSpec;

    fn bytes(value: &str) -> ByteString {
        ByteString(value.as_bytes().to_vec())
    }

    fn provisioned_secret(name: &str) -> Secret {
        let mut secret = Secret {
            data: Some(BTreeMap::from([
                ("password".to_string(), bytes("hunter2")),
                ("host".to_string(), bytes("db.internal")),
            ])),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        };
        secret.metadata.name = Some(name.to_string());
        secret.metadata.namespace = Some("shop".to_string());
        secret.metadata.uid = Some("secret-uid".to_string());
        secret
    }

    fn binding_with_renames(renames: &[(&str, &str)]) -> TemplatedBinding {
        TemplatedBinding::new(
            "orders-db-creds",
            TemplatedBindingSpec {
                secret_keys: renames
                    .iter()
                    .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                    .collect(),
                ..TemplatedBindingSpec::default()
            },
        )
    }

    #[test]
    fn test_secret_names() {
        assert_eq!(shadow_secret_name("orders-creds"), "orders-creds-shadow");
        assert_eq!(bound_secret_name("orders-creds-shadow"), Some("orders-creds"));
        assert_eq!(bound_secret_name("orders-creds"), None);
        assert_eq!(bound_secret_name("-shadow"), None);
        assert_eq!(
            bound_secret_name(&shadow_secret_name("orders-creds")),
            Some("orders-creds")
        );
    }

    #[test]
    fn test_rekey_renames_and_passes_through() {
        let data = provisioned_secret("x-shadow").data.unwrap();
        let renames = BTreeMap::from([("password".to_string(), "db-password".to_string())]);
        let rekeyed = rekey_secret_data(&data, &renames);
        assert_eq!(rekeyed["db-password"], bytes("hunter2"));
        assert_eq!(rekeyed["host"], bytes("db.internal"));
        assert!(!rekeyed.contains_key("password"));
    }

    #[test]
    fn test_build_shadow_secret() {
        let provisioned = provisioned_secret("orders-creds-shadow");
        let shadow =
            build_shadow_secret(&provisioned, &binding_with_renames(&[("password", "pw")])).unwrap();
        assert_eq!(shadow.name_any(), "orders-creds");
        assert_eq!(shadow.namespace().as_deref(), Some("shop"));
        assert_eq!(shadow.type_.as_deref(), Some("Opaque"));
        assert_eq!(shadow.data.as_ref().unwrap()["pw"], bytes("hunter2"));
        assert!(is_controlled_by(&shadow.metadata, &provisioned));

        assert!(build_shadow_secret(&provisioned_secret("plain"), &binding_with_renames(&[])).is_none());
    }

    #[test]
    fn test_refresh_only_on_change() {
        let provisioned = provisioned_secret("orders-creds-shadow");
        let binding = binding_with_renames(&[("password", "pw")]);
        let shadow = build_shadow_secret(&provisioned, &binding).unwrap();
        assert!(refresh_shadow_secret(&provisioned, &binding, &shadow).is_none());

        let mut rotated = provisioned.clone();
        rotated
            .data
            .as_mut()
            .unwrap()
            .insert("password".to_string(), bytes("correct-horse"));
        let refreshed = refresh_shadow_secret(&rotated, &binding, &shadow).unwrap();
        assert_eq!(refreshed.data.as_ref().unwrap()["pw"], bytes("correct-horse"));
        assert_eq!(refreshed.metadata.owner_references, shadow.metadata.owner_references);
    }
}
