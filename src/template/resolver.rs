//! # Template Resolver
//!
//! Finds the templates that apply to a templated resource and folds them into
//! one effective template.
//!
//! Lookup is by service type label at three tiers. Each tier contributes at most
//! one template; the fold runs broker, cluster, namespace so the narrowest tier
//! wins.
//!
//! Several broker templates for one service type cannot be told apart. For an
//! instance that still needs a class and plan this is an error unless a
//! cluster or namespace template exists, in which case the broker tier is
//! skipped.

use crate::crd::{
    BindingTemplateSpec, InstanceTemplateSpec, TemplateTier, TemplatedBinding, TemplatedInstance,
    TieredTemplate,
};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::store::{LabelFilter, Listers};
use crate::template::merge::{fold_templates, MergeTemplate};
use crate::template::plan::PlanResolver;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves effective templates from cached template tiers
#[derive(Clone)]
pub struct TemplateResolver {
    listers: Listers,
    plans: Arc<dyn PlanResolver>,
}

impl std::fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateResolver").finish_non_exhaustive()
    }
}

impl TemplateResolver {
    pub fn new(listers: Listers, plans: Arc<dyn PlanResolver>) -> Self {
        Self { listers, plans }
    }

    /// Effective instance template for `instance`.
    ///
    /// Returns the empty template when nothing matches and the instance already
    /// names a class and plan.
    ///
    /// # Errors
    ///
    /// - [`Error::AmbiguousTemplate`] for several broker templates with nothing narrower
    /// - [`Error::TemplateNotFound`] when no tier matches and a class or plan is missing
    /// - [`Error::MalformedParameters`] from the fold
    /// - errors from the plan resolver
    pub fn resolve_instance_template(
        &self,
        instance: &TemplatedInstance,
    ) -> Result<InstanceTemplateSpec> {
        let service_type = instance.spec.service_type.as_str();
        let namespace = instance.namespace();
        let filter = LabelFilter::for_service_type(service_type);

        let namespaced = pick_single(
            self.listers.instance_templates.list(namespace.as_deref(), &filter),
            service_type,
        );
        let cluster = pick_single(
            self.listers.cluster_instance_templates.list(None, &filter),
            service_type,
        );
        let brokers = sorted_by_name(self.listers.broker_instance_templates.list(None, &filter));

        let narrower_exists = namespaced.is_some() || cluster.is_some();
        let broker = match brokers.len() {
            0 | 1 => brokers.into_iter().next(),
            count if narrower_exists || !instance.requires_template() => {
                debug!(service_type, count, "several broker templates match, skipping broker tier");
                None
            }
            count => {
                return Err(Error::AmbiguousTemplate {
                    service_type: service_type.to_string(),
                    count,
                })
            }
        };

        let tiers = [
            broker.as_ref().map(tier_entry),
            cluster.as_ref().map(tier_entry),
            namespaced.as_ref().map(tier_entry),
        ];
        if tiers.iter().all(Option::is_none) {
            if instance.requires_template() {
                return Err(Error::TemplateNotFound {
                    service_type: service_type.to_string(),
                });
            }
            debug!(service_type, "no templates match, instance names its own class and plan");
            return Ok(InstanceTemplateSpec::default());
        }

        let mut effective = fold_tiers(tiers.into_iter().flatten())?;

        if instance.spec.plan_selector.is_some() {
            match self.plans.resolve_plan(instance)? {
                Some(plan) => {
                    debug!(plan = %plan.describe(), "plan selector resolved");
                    effective.plan_reference = plan;
                }
                None => debug!("plan selector matched nothing"),
            }
        }

        Ok(effective)
    }

    /// Effective binding template for `binding`, keyed by its instance's service type.
    ///
    /// Returns the empty template when nothing matches.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the referenced templated instance is not cached
    /// - [`Error::MalformedParameters`] from the fold
    pub fn resolve_binding_template(&self, binding: &TemplatedBinding) -> Result<BindingTemplateSpec> {
        let namespace = binding.namespace();
        let instance_name = &binding.spec.instance_ref.name;
        let instance = self
            .listers
            .templated_instances
            .get(namespace.as_deref(), instance_name)
            .ok_or_else(|| Error::NotFound {
                kind: TemplatedInstance::kind(&()).to_string(),
                name: format!("{}/{instance_name}", namespace.as_deref().unwrap_or_default()),
            })?;

        let service_type = instance.spec.service_type.as_str();
        let filter = LabelFilter::for_service_type(service_type);

        let namespaced = pick_single(
            self.listers.binding_templates.list(namespace.as_deref(), &filter),
            service_type,
        );
        let cluster = pick_single(
            self.listers.cluster_binding_templates.list(None, &filter),
            service_type,
        );
        let broker = pick_single(
            self.listers.broker_binding_templates.list(None, &filter),
            service_type,
        );

        fold_tiers(
            [
                broker.as_ref().map(tier_entry),
                cluster.as_ref().map(tier_entry),
                namespaced.as_ref().map(tier_entry),
            ]
            .into_iter()
            .flatten(),
        )
    }
}

fn tier_entry<T: TieredTemplate>(template: &T) -> (TemplateTier, &T::Payload) {
    (T::TIER, template.payload())
}

fn fold_tiers<'a, P>(tiers: impl Iterator<Item = (TemplateTier, &'a P)>) -> Result<P>
where
    P: MergeTemplate + Default + 'a,
{
    fold_templates(tiers.map(|(tier, payload)| {
        metrics::increment_templates_resolved(tier);
        payload
    }))
}

fn sorted_by_name<T: TieredTemplate>(mut found: Vec<T>) -> Vec<T> {
    found.sort_by(|a, b| a.meta().name.cmp(&b.meta().name));
    found
}

/// First template by name; several at one tier is a misconfiguration worth a warning
fn pick_single<T: TieredTemplate>(found: Vec<T>, service_type: &str) -> Option<T> {
    let found = sorted_by_name(found);
    if found.len() > 1 {
        warn!(
            tier = %T::TIER,
            service_type,
            count = found.len(),
            chosen = found[0].meta().name.as_deref().unwrap_or_default(),
            "several templates match at one tier, using the first by name"
        );
    }
    found.into_iter().next()
}
