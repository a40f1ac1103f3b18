//! # Templates
//!
//! Lookup and merging of template tiers.
//!
//! - `merge.rs` - pure merge functions and the tier fold
//! - `resolver.rs` - finds the templates that apply to a resource and folds them
//! - `plan.rs` - plan selection seam for instances that use a plan selector
//!
//! Builders accept anything implementing the capability traits below, so an
//! effective template, a single tier or a test fixture all work the same way.

pub mod merge;
pub mod plan;
pub mod resolver;

pub use merge::{
    fold_templates, merge_parameters, merge_parameters_from, merge_plan_reference,
    merge_secret_keys, same_parameter_bytes, MergeTemplate,
};
pub use plan::{PlanResolver, UnimplementedPlanResolver};
pub use resolver::TemplateResolver;

use crate::crd::{BindingTemplateSpec, InstanceTemplateSpec, ParametersFromSource, PlanReference};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameter defaults carried by every template
pub trait TemplateContent {
    fn parameters(&self) -> Option<&Value>;
    fn parameters_from(&self) -> &[ParametersFromSource];
}

/// Class and plan defaults
pub trait PlanDefaults: TemplateContent {
    fn plan_reference(&self) -> &PlanReference;
}

/// Credential key renames
pub trait SecretKeyDefaults: TemplateContent {
    fn secret_keys(&self) -> &BTreeMap<String, String>;
}

impl TemplateContent for InstanceTemplateSpec {
    fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }

    fn parameters_from(&self) -> &[ParametersFromSource] {
        &self.parameters_from
    }
}

impl PlanDefaults for InstanceTemplateSpec {
    fn plan_reference(&self) -> &PlanReference {
        &self.plan_reference
    }
}

impl TemplateContent for BindingTemplateSpec {
    fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }

    fn parameters_from(&self) -> &[ParametersFromSource] {
        &self.parameters_from
    }
}

impl SecretKeyDefaults for BindingTemplateSpec {
    fn secret_keys(&self) -> &BTreeMap<String, String> {
        &self.secret_keys
    }
}
