use super::{managed_binding_for_secret, parse_key, Synchronizer};
use crate::builder::{
    bound_secret_name, build_shadow_secret, is_controlled_by, refresh_shadow_secret,
};
use crate::error::Result;
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use tracing::{debug, info, trace, warn, Instrument};

const KIND: &str = "Secret";

impl Synchronizer {
    /// Republish the credentials of a provisioned binding's secret.
    ///
    /// `key` names the secret the catalog wrote (`<name>-shadow`). Secrets without
    /// the suffix, or not traceable to a templated binding, are skipped. So is a
    /// target secret that already exists under another controller.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn synchronize_secret(&self, key: &str) -> Result<Option<Secret>> {
        let Some((namespace, name)) = parse_key(key) else {
            return Ok(None);
        };
        let Some(bound_name) = bound_secret_name(&name).map(str::to_string) else {
            trace!(secret = %key, "not a provisioned binding secret");
            return Ok(None);
        };
        let span = tracing::info_span!(
            "sync.secret",
            resource.namespace = %namespace,
            resource.name = %name
        );

        async move {
            let Some(provisioned) = self.listers.secrets.get(Some(&namespace), &name) else {
                debug!("provisioned secret no longer exists");
                return Ok(None);
            };
            let Some(binding) = managed_binding_for_secret(&self.listers, &provisioned) else {
                debug!("secret is not managed by a templated binding");
                return Ok(None);
            };

            match self.listers.secrets.get(Some(&namespace), &bound_name) {
                None => {
                    let Some(shadow) = build_shadow_secret(&provisioned, &binding) else {
                        return Ok(None);
                    };
                    let created = self.clients.secrets.create(&shadow).await?;
                    metrics::record_write(KIND, "create");
                    info!(target_secret = %bound_name, "published binding credentials");
                    Ok(Some(created))
                }
                Some(existing) if !is_controlled_by(&existing.metadata, &provisioned) => {
                    warn!(
                        target_secret = %bound_name,
                        "target secret is controlled by someone else, skipping"
                    );
                    Ok(Some(existing))
                }
                Some(existing) => match refresh_shadow_secret(&provisioned, &binding, &existing) {
                    None => Ok(Some(existing)),
                    Some(refreshed) => {
                        let updated = self.clients.secrets.update(&refreshed).await?;
                        metrics::record_write(KIND, "update");
                        info!(target_secret = %bound_name, "refreshed binding credentials");
                        Ok(Some(updated))
                    }
                },
            }
        }
        .instrument(span)
        .await
    }
}
