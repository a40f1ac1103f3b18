//! # Reconcile Tests
//!
//! The reconcile functions and error policy handed to the controllers, driven
//! against the in-memory store.

mod common;

use common::*;
use kube::runtime::controller::Action;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use svcat_templates::crd::{ServiceInstance, ServiceInstanceSpec, TemplatedInstance};
use svcat_templates::runtime::backoff::ItemBackoff;
use svcat_templates::runtime::reconciler::{
    error_policy, reconcile_binding, reconcile_instance, reconcile_secret, Context,
};
use svcat_templates::runtime::triggers::instances_for_template;
use svcat_templates::store::memory::MemoryCluster;
use svcat_templates::store::Lister;
use svcat_templates::Error;

const RESYNC: Duration = Duration::from_secs(300);

fn context(cluster: &MemoryCluster) -> (Arc<Context>, Arc<RecordingEvents>) {
    let (synchronizer, events) = synchronizer(cluster);
    let retries = ItemBackoff::new(Duration::from_millis(5), Duration::from_millis(50));
    (Arc::new(Context::new(synchronizer, retries, RESYNC)), events)
}

#[tokio::test]
async fn test_template_arriving_late_unblocks_instance() {
    let cluster = MemoryCluster::new();
    let (ctx, _events) = context(&cluster);
    let instance = Arc::new(
        cluster
            .templated_instances
            .insert(templated_instance("orders-db", "mysqldb")),
    );

    // no template yet: the instance fails and backs off
    let err = reconcile_instance(Arc::clone(&instance), Arc::clone(&ctx))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { .. }));
    assert_eq!(
        error_policy(Arc::clone(&instance), &err, Arc::clone(&ctx)),
        Action::requeue(Duration::from_millis(5))
    );
    assert_eq!(
        error_policy(Arc::clone(&instance), &err, Arc::clone(&ctx)),
        Action::requeue(Duration::from_millis(10))
    );
    assert!(Lister::get(cluster.service_instances.as_ref(), Some(NAMESPACE), "orders-db").is_none());

    // the template shows up and maps back to the waiting instance
    let template = cluster.cluster_instance_templates.insert(cluster_template(
        "mysql-defaults",
        "mysqldb",
        instance_payload(Some(("mysql", "standard")), Some(json!({"location": "eastus"}))),
    ));
    let triggered = instances_for_template(&cluster.listers(), &template);
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].name, "orders-db");

    let action = reconcile_instance(Arc::clone(&instance), Arc::clone(&ctx))
        .await
        .unwrap();
    assert_eq!(action, Action::requeue(RESYNC));
    assert!(Lister::get(cluster.service_instances.as_ref(), Some(NAMESPACE), "orders-db").is_some());

    // success cleared the failure history
    assert_eq!(
        error_policy(instance, &err, ctx),
        Action::requeue(Duration::from_millis(5))
    );
}

#[tokio::test]
async fn test_unmanaged_conflict_is_not_retried() {
    let cluster = MemoryCluster::new();
    cluster.cluster_instance_templates.insert(cluster_template(
        "mysql-defaults",
        "mysqldb",
        instance_payload(Some(("mysql", "standard")), None),
    ));
    let instance = Arc::new(
        cluster
            .templated_instances
            .insert(templated_instance("orders-db", "mysqldb")),
    );
    let mut foreign = ServiceInstance::new("orders-db", ServiceInstanceSpec::default());
    foreign.metadata.namespace = Some(NAMESPACE.to_string());
    cluster.service_instances.insert(foreign);

    let (ctx, events) = context(&cluster);
    let err = reconcile_instance(Arc::clone(&instance), Arc::clone(&ctx))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnmanagedResource { .. }));
    assert_eq!(error_policy(instance, &err, ctx), Action::await_change());
    assert_eq!(events.events().len(), 1);
}

#[tokio::test]
async fn test_deleted_object_waits_for_change() {
    let cluster = MemoryCluster::new();
    let (ctx, _events) = context(&cluster);

    let gone = Arc::new(templated_instance("orders-db", "mysqldb"));
    let action = reconcile_instance(gone, Arc::clone(&ctx)).await.unwrap();
    assert_eq!(action, Action::await_change());

    let gone = Arc::new(templated_binding("orders-creds", "orders-db"));
    let action = reconcile_binding(gone, ctx).await.unwrap();
    assert_eq!(action, Action::await_change());
}

#[tokio::test]
async fn test_unrelated_secret_waits_for_change() {
    let cluster = MemoryCluster::new();
    let (ctx, _events) = context(&cluster);
    let plain = Arc::new(cluster.secrets.insert(secret("tls-cert", &[("tls.crt", "pem")])));
    let writes = cluster.secrets.write_count();

    let action = reconcile_secret(plain, ctx).await.unwrap();
    assert_eq!(action, Action::await_change());
    assert_eq!(cluster.secrets.write_count(), writes);
}

#[tokio::test]
async fn test_kinds_back_off_independently() {
    let cluster = MemoryCluster::new();
    let (ctx, _events) = context(&cluster);
    let instance = Arc::new(templated_instance("orders-db", "mysqldb"));
    let shadow = Arc::new(secret("orders-db", &[]));
    let err = Error::TemplateNotFound {
        service_type: "mysqldb".to_string(),
    };

    assert_eq!(
        error_policy::<TemplatedInstance>(Arc::clone(&instance), &err, Arc::clone(&ctx)),
        Action::requeue(Duration::from_millis(5))
    );
    assert_eq!(
        error_policy::<TemplatedInstance>(instance, &err, Arc::clone(&ctx)),
        Action::requeue(Duration::from_millis(10))
    );
    // same namespace and name, different kind
    assert_eq!(
        error_policy(shadow, &err, ctx),
        Action::requeue(Duration::from_millis(5))
    );
}
