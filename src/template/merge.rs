//! # Merge Engine
//!
//! Pure functions that fold template tiers together.
//!
//! Every function takes a `base` and an `overlay`; the overlay is the narrower
//! tier and wins on conflict. Folding broker, then cluster, then namespace
//! gives namespace templates final precedence.

use crate::crd::{BindingTemplateSpec, InstanceTemplateSpec, ParametersFromSource, PlanReference};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Deep-merge two parameter documents.
///
/// A missing overlay returns the base unchanged and a missing base returns the
/// overlay. Otherwise both must be JSON objects: nested objects merge key by key and
/// the overlay wins on scalar or type conflicts.
///
/// # Errors
///
/// [`Error::MalformedParameters`] when both documents are present and either is not
/// a JSON object.
pub fn merge_parameters(base: Option<&Value>, overlay: Option<&Value>) -> Result<Option<Value>> {
    let (base, overlay) = match (base, overlay) {
        (base, None) => return Ok(base.cloned()),
        (None, overlay) => return Ok(overlay.cloned()),
        (Some(base), Some(overlay)) => (base, overlay),
    };

    let mut merged = as_object(base, "base")?.clone();
    deep_merge(&mut merged, as_object(overlay, "overlay")?);
    Ok(Some(Value::Object(merged)))
}

fn as_object<'a>(value: &'a Value, side: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| Error::MalformedParameters {
        reason: format!("{side} parameters must be a JSON object, got {}", type_name(value)),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Pick parameter sources, all or nothing.
///
/// The resource's own list wins outright when it has any entry; lists are never
/// merged entry by entry.
pub fn merge_parameters_from(
    own: &[ParametersFromSource],
    template: &[ParametersFromSource],
) -> Vec<ParametersFromSource> {
    if own.is_empty() {
        template.to_vec()
    } else {
        own.to_vec()
    }
}

/// Merge class and plan identifiers.
///
/// Each identifier set in the overlay replaces the same identifier in the base.
pub fn merge_plan_reference(base: &PlanReference, overlay: &PlanReference) -> PlanReference {
    if overlay.is_empty() {
        return base.clone();
    }
    if base.is_empty() {
        return overlay.clone();
    }

    fn pick(base: &Option<String>, overlay: &Option<String>) -> Option<String> {
        if crate::crd::is_set(overlay) {
            overlay.clone()
        } else {
            base.clone()
        }
    }

    PlanReference {
        cluster_service_class_external_name: pick(
            &base.cluster_service_class_external_name,
            &overlay.cluster_service_class_external_name,
        ),
        cluster_service_plan_external_name: pick(
            &base.cluster_service_plan_external_name,
            &overlay.cluster_service_plan_external_name,
        ),
        cluster_service_class_name: pick(
            &base.cluster_service_class_name,
            &overlay.cluster_service_class_name,
        ),
        cluster_service_plan_name: pick(
            &base.cluster_service_plan_name,
            &overlay.cluster_service_plan_name,
        ),
        service_class_external_name: pick(
            &base.service_class_external_name,
            &overlay.service_class_external_name,
        ),
        service_plan_external_name: pick(
            &base.service_plan_external_name,
            &overlay.service_plan_external_name,
        ),
        service_class_name: pick(&base.service_class_name, &overlay.service_class_name),
        service_plan_name: pick(&base.service_plan_name, &overlay.service_plan_name),
    }
}

/// Shallow merge of secret key renames; overlay entries replace base entries.
pub fn merge_secret_keys(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    if overlay.is_empty() {
        return base.clone();
    }
    if base.is_empty() {
        return overlay.clone();
    }
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Whether two parameter payloads serialize to the same bytes.
///
/// This is the drift signal between a templated resource and its provisioned
/// counterpart. Object keys serialize in sorted order, so equal documents always
/// produce equal bytes.
///
/// # Errors
///
/// Serialization failures.
pub fn same_parameter_bytes(left: Option<&Value>, right: Option<&Value>) -> Result<bool> {
    Ok(parameter_bytes(left)? == parameter_bytes(right)?)
}

fn parameter_bytes(value: Option<&Value>) -> Result<Vec<u8>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => Ok(serde_json::to_vec(value)?),
    }
}

/// Template payloads that can be folded tier over tier
pub trait MergeTemplate: Sized {
    /// Merge `overlay` (narrower tier) on top of `base`
    ///
    /// # Errors
    ///
    /// [`Error::MalformedParameters`] from the parameter merge.
    fn merge(base: &Self, overlay: &Self) -> Result<Self>;
}

impl MergeTemplate for InstanceTemplateSpec {
    fn merge(base: &Self, overlay: &Self) -> Result<Self> {
        Ok(Self {
            plan_reference: merge_plan_reference(&base.plan_reference, &overlay.plan_reference),
            parameters: merge_parameters(base.parameters.as_ref(), overlay.parameters.as_ref())?,
            parameters_from: merge_parameters_from(&overlay.parameters_from, &base.parameters_from),
        })
    }
}

impl MergeTemplate for BindingTemplateSpec {
    fn merge(base: &Self, overlay: &Self) -> Result<Self> {
        Ok(Self {
            parameters: merge_parameters(base.parameters.as_ref(), overlay.parameters.as_ref())?,
            parameters_from: merge_parameters_from(&overlay.parameters_from, &base.parameters_from),
            secret_keys: merge_secret_keys(&base.secret_keys, &overlay.secret_keys),
        })
    }
}

/// Fold templates from broadest to narrowest into one effective template.
///
/// An empty iterator yields the default (empty) template.
///
/// # Errors
///
/// [`Error::MalformedParameters`] from any tier.
pub fn fold_templates<'a, P>(tiers: impl IntoIterator<Item = &'a P>) -> Result<P>
where
    P: MergeTemplate + Default + 'a,
{
    tiers
        .into_iter()
        .try_fold(P::default(), |effective, tier| P::merge(&effective, tier))
}
