//! # Plan Selection
//!
//! Instances may describe the plan they want with a label selector instead of
//! naming one. Matching a selector against catalog plans happens behind
//! [`PlanResolver`].

use crate::crd::{PlanReference, TemplatedInstance};
use crate::error::Result;

#[cfg(test)]
use mockall::automock;

/// Picks a concrete class and plan for an instance that carries a plan selector
#[cfg_attr(test, automock)]
pub trait PlanResolver: Send + Sync {
    /// `Ok(None)` when no plan could be chosen; the effective plan is then left as the
    /// templates produced it
    ///
    /// # Errors
    ///
    /// Lookup failures that should be retried.
    fn resolve_plan(&self, instance: &TemplatedInstance) -> Result<Option<PlanReference>>;
}

/// Resolver used until plan selection is wired to the catalog; never picks a plan
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedPlanResolver;

impl PlanResolver for UnimplementedPlanResolver {
    fn resolve_plan(&self, instance: &TemplatedInstance) -> Result<Option<PlanReference>> {
        tracing::debug!(
            instance = instance.metadata.name.as_deref().unwrap_or_default(),
            "plan selectors are not evaluated; keeping template plan"
        );
        Ok(None)
    }
}
