use super::{now, parse_key, Synchronizer};
use crate::builder::{
    apply_binding_template, build_provisioned_binding, is_controlled_by,
    refresh_provisioned_binding,
};
use crate::crd::{ServiceBinding, TemplatedBinding, TemplatedBindingStatus};
use crate::error::Result;
use crate::observability::metrics;
use crate::template::same_parameter_bytes;
use tracing::{debug, info, Instrument};

const KIND: &str = "ServiceBinding";

impl Synchronizer {
    /// Bring the provisioned binding for `key` in line with its templated binding.
    ///
    /// Mirrors [`Synchronizer::synchronize_instance`]: create with templates applied
    /// on first sight, then push parameter drift and copy status back.
    ///
    /// # Errors
    ///
    /// Resolution, builder and store errors; [`crate::Error::UnmanagedResource`] when a
    /// same-named binding is controlled by something else.
    pub async fn synchronize_binding(&self, key: &str) -> Result<Option<TemplatedBinding>> {
        let Some((namespace, name)) = parse_key(key) else {
            return Ok(None);
        };
        let span = tracing::info_span!(
            "sync.binding",
            resource.namespace = %namespace,
            resource.name = %name
        );

        async move {
            let Some(binding) = self.listers.templated_bindings.get(Some(&namespace), &name) else {
                debug!("templated binding no longer exists");
                return Ok(None);
            };

            let existing = self.listers.service_bindings.get(Some(&namespace), &name);
            let (binding, provisioned) = match existing {
                Some(provisioned) if !is_controlled_by(&provisioned.metadata, &binding) => {
                    return Err(self.reject_unmanaged(&binding, &provisioned).await);
                }
                Some(provisioned) => {
                    let provisioned = self.refresh_binding(&binding, provisioned).await?;
                    (binding, provisioned)
                }
                None => self.provision_binding(binding).await?,
            };

            self.record_binding_status(binding, &provisioned)
                .await
                .map(Some)
        }
        .instrument(span)
        .await
    }

    async fn provision_binding(
        &self,
        binding: TemplatedBinding,
    ) -> Result<(TemplatedBinding, ServiceBinding)> {
        let template = self.resolver.resolve_binding_template(&binding)?;
        let applied = apply_binding_template(&binding, &template)?;
        let binding = if applied.spec == binding.spec {
            binding
        } else {
            debug!("persisting template defaults on templated binding");
            self.clients.templated_bindings.update(&applied).await?
        };

        let desired = build_provisioned_binding(&binding);
        let provisioned = self.clients.service_bindings.create(&desired).await?;
        metrics::record_write(KIND, "create");
        info!(
            instance = %binding.spec.instance_ref.name,
            secret = %provisioned.spec.secret_name,
            "created service binding"
        );
        Ok((binding, provisioned))
    }

    async fn refresh_binding(
        &self,
        binding: &TemplatedBinding,
        provisioned: ServiceBinding,
    ) -> Result<ServiceBinding> {
        if same_parameter_bytes(
            binding.spec.parameters.as_ref(),
            provisioned.spec.parameters.as_ref(),
        )? {
            return Ok(provisioned);
        }

        let refreshed = refresh_provisioned_binding(binding, &provisioned);
        let updated = self.clients.service_bindings.update(&refreshed).await?;
        metrics::record_write(KIND, "update");
        info!("pushed parameter changes to service binding");
        Ok(updated)
    }

    async fn record_binding_status(
        &self,
        mut binding: TemplatedBinding,
        provisioned: &ServiceBinding,
    ) -> Result<TemplatedBinding> {
        let observed = TemplatedBindingStatus {
            conditions: provisioned
                .status
                .as_ref()
                .map(|status| status.conditions.clone())
                .unwrap_or_default(),
            secret_name: Some(binding.spec.secret_name.clone()),
            synced: true,
            last_sync_time: now(),
        };

        if binding
            .status
            .as_ref()
            .is_some_and(|current| current.same_observation(&observed))
        {
            return Ok(binding);
        }
        binding.status = Some(observed);
        match self.clients.templated_bindings.update_status(&binding).await {
            Err(e) if e.is_not_found() => {
                debug!("templated binding deleted mid-pass, status not recorded");
                Ok(binding)
            }
            written => written,
        }
    }
}
