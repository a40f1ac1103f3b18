use super::{now, parse_key, Synchronizer};
use crate::builder::{
    apply_instance_template, build_provisioned_instance, is_controlled_by,
    refresh_provisioned_instance,
};
use crate::crd::{ServiceInstance, TemplatedInstance, TemplatedInstanceStatus};
use crate::error::Result;
use crate::observability::metrics;
use crate::template::same_parameter_bytes;
use tracing::{debug, info, Instrument};

const KIND: &str = "ServiceInstance";

impl Synchronizer {
    /// Bring the provisioned instance for `key` in line with its templated instance.
    ///
    /// Creates the provisioned instance on first sight, after applying templates and
    /// persisting the result on the templated instance. Afterwards only parameter
    /// drift is pushed down. Status is copied back on every pass.
    ///
    /// # Errors
    ///
    /// Resolution, builder and store errors; [`crate::Error::UnmanagedResource`] when a
    /// same-named instance is controlled by something else.
    pub async fn synchronize_instance(&self, key: &str) -> Result<Option<TemplatedInstance>> {
        let Some((namespace, name)) = parse_key(key) else {
            return Ok(None);
        };
        let span = tracing::info_span!(
            "sync.instance",
            resource.namespace = %namespace,
            resource.name = %name
        );

        async move {
            let Some(instance) = self.listers.templated_instances.get(Some(&namespace), &name)
            else {
                debug!("templated instance no longer exists");
                return Ok(None);
            };

            let existing = self.listers.service_instances.get(Some(&namespace), &name);
            let (instance, provisioned) = match existing {
                Some(provisioned) if !is_controlled_by(&provisioned.metadata, &instance) => {
                    return Err(self.reject_unmanaged(&instance, &provisioned).await);
                }
                Some(provisioned) => {
                    let provisioned = self.refresh_instance(&instance, provisioned).await?;
                    (instance, provisioned)
                }
                None => self.provision_instance(instance).await?,
            };

            self.record_instance_status(instance, &provisioned)
                .await
                .map(Some)
        }
        .instrument(span)
        .await
    }

    async fn provision_instance(
        &self,
        instance: TemplatedInstance,
    ) -> Result<(TemplatedInstance, ServiceInstance)> {
        let template = self.resolver.resolve_instance_template(&instance)?;
        let applied = apply_instance_template(&instance, &template)?;
        let instance = if applied.spec == instance.spec {
            instance
        } else {
            debug!("persisting template defaults on templated instance");
            self.clients.templated_instances.update(&applied).await?
        };

        let desired = build_provisioned_instance(&instance)?;
        let provisioned = self.clients.service_instances.create(&desired).await?;
        metrics::record_write(KIND, "create");
        info!(
            plan = %instance.spec.plan_reference.describe(),
            "created service instance"
        );
        Ok((instance, provisioned))
    }

    async fn refresh_instance(
        &self,
        instance: &TemplatedInstance,
        provisioned: ServiceInstance,
    ) -> Result<ServiceInstance> {
        let in_sync = same_parameter_bytes(
            instance.spec.parameters.as_ref(),
            provisioned.spec.parameters.as_ref(),
        )? && instance.spec.update_requests == provisioned.spec.update_requests;
        if in_sync {
            return Ok(provisioned);
        }

        let refreshed = refresh_provisioned_instance(instance, &provisioned);
        let updated = self.clients.service_instances.update(&refreshed).await?;
        metrics::record_write(KIND, "update");
        info!("pushed parameter changes to service instance");
        Ok(updated)
    }

    async fn record_instance_status(
        &self,
        mut instance: TemplatedInstance,
        provisioned: &ServiceInstance,
    ) -> Result<TemplatedInstance> {
        let reported = provisioned.status.clone().unwrap_or_default();
        let observed = TemplatedInstanceStatus {
            class_ref: provisioned.spec.cluster_service_class_ref.clone(),
            plan_ref: provisioned.spec.cluster_service_plan_ref.clone(),
            provision_status: reported.provision_status,
            conditions: reported.conditions,
            synced: true,
            last_sync_time: now(),
        };

        if instance
            .status
            .as_ref()
            .is_some_and(|current| current.same_observation(&observed))
        {
            return Ok(instance);
        }
        instance.status = Some(observed);
        match self.clients.templated_instances.update_status(&instance).await {
            Err(e) if e.is_not_found() => {
                debug!("templated instance deleted mid-pass, status not recorded");
                Ok(instance)
            }
            written => written,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::controller_reference;
    use crate::controller::events::{MockEventRecorder, REASON_UNMANAGED};
    use crate::controller::Synchronizer;
    use crate::crd::{
        PlanReference, ServiceInstance, ServiceInstanceSpec, TemplatedInstance,
        TemplatedInstanceSpec,
    };
    use crate::error::Error;
    use crate::store::memory::MemoryCluster;
    use crate::template::UnimplementedPlanResolver;
    use serde_json::json;
    use std::sync::Arc;

    fn explicit_instance() -> TemplatedInstance {
        let mut instance = TemplatedInstance::new(
            "orders-db",
            TemplatedInstanceSpec {
                service_type: "mysqldb".to_string(),
                plan_reference: PlanReference::cluster_external("mysql", "standard"),
                parameters: Some(json!({"location": "eastus"})),
                ..TemplatedInstanceSpec::default()
            },
        );
        instance.metadata.namespace = Some("shop".to_string());
        instance
    }

    #[tokio::test]
    async fn test_foreign_instance_is_reported_and_left_alone() {
        let cluster = MemoryCluster::new();
        let instance = cluster.templated_instances.insert(explicit_instance());

        let mut foreign = ServiceInstance::new("orders-db", ServiceInstanceSpec::default());
        foreign.metadata.namespace = Some("shop".to_string());
        let mut other_owner = TemplatedInstance::new("someone-else", TemplatedInstanceSpec::default());
        other_owner.metadata.uid = Some("other".to_string());
        foreign.metadata.owner_references = Some(vec![controller_reference(&other_owner)]);
        let foreign = cluster.service_instances.insert(foreign);

        let mut events = MockEventRecorder::new();
        events
            .expect_warning()
            .withf(|object, reason, _| {
                object.name.as_deref() == Some("orders-db") && reason == REASON_UNMANAGED
            })
            .times(1)
            .returning(|_, _, _| ());

        let synchronizer = Synchronizer::new(
            cluster.listers(),
            cluster.clients(),
            Arc::new(UnimplementedPlanResolver),
            Arc::new(events),
        );
        let err = synchronizer
            .synchronize_instance("shop/orders-db")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnmanagedResource { .. }));
        assert!(!err.is_retryable());
        assert_eq!(cluster.templated_instances.write_count(), 0);
        assert_eq!(cluster.service_instances.write_count(), 0);
        let stored = cluster.templated_instances.all();
        assert_eq!(stored[0].spec, instance.spec);
        assert_eq!(stored[0].metadata, instance.metadata);
        let stored = cluster.service_instances.all();
        assert_eq!(stored[0].spec, foreign.spec);
        assert_eq!(stored[0].metadata, foreign.metadata);
    }

    #[tokio::test]
    async fn test_missing_instance_is_skipped_without_events() {
        let cluster = MemoryCluster::new();
        let mut events = MockEventRecorder::new();
        events.expect_warning().times(0);

        let synchronizer = Synchronizer::new(
            cluster.listers(),
            cluster.clients(),
            Arc::new(UnimplementedPlanResolver),
            Arc::new(events),
        );
        assert!(synchronizer
            .synchronize_instance("shop/ghost")
            .await
            .unwrap()
            .is_none());
        assert!(synchronizer
            .synchronize_instance("not-a-key")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_instance_deleted_mid_pass_is_not_an_error() {
        // the cache still shows the instance, the API server no longer has it
        let cached = MemoryCluster::new();
        cached.templated_instances.insert(explicit_instance());
        let live = MemoryCluster::new();
        let mut events = MockEventRecorder::new();
        events.expect_warning().times(0);

        let synchronizer = Synchronizer::new(
            cached.listers(),
            live.clients(),
            Arc::new(UnimplementedPlanResolver),
            Arc::new(events),
        );
        let synced = synchronizer
            .synchronize_instance("shop/orders-db")
            .await
            .unwrap()
            .unwrap();

        assert!(synced.status.is_some_and(|status| status.synced));
        assert_eq!(live.service_instances.write_count(), 1);
        assert_eq!(live.templated_instances.write_count(), 0);
    }

    #[tokio::test]
    async fn test_status_write_skipped_when_unchanged() {
        let cluster = MemoryCluster::new();
        cluster.templated_instances.insert(explicit_instance());
        let mut events = MockEventRecorder::new();
        events.expect_warning().times(0);
        let synchronizer = Synchronizer::new(
            cluster.listers(),
            cluster.clients(),
            Arc::new(UnimplementedPlanResolver),
            Arc::new(events),
        );

        synchronizer.synchronize_instance("shop/orders-db").await.unwrap();
        let writes = cluster.templated_instances.write_count();
        synchronizer.synchronize_instance("shop/orders-db").await.unwrap();
        assert_eq!(cluster.templated_instances.write_count(), writes);
        assert_eq!(cluster.service_instances.write_count(), 1);
    }
}
