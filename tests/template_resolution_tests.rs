//! # Template Resolution Tests
//!
//! Resolution of effective templates across the broker, cluster and namespace
//! tiers, driven through the in-memory store.

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use svcat_templates::crd::PlanReference;
use svcat_templates::store::memory::MemoryCluster;
use svcat_templates::template::{TemplateResolver, UnimplementedPlanResolver};
use svcat_templates::Error;

fn resolver(cluster: &MemoryCluster) -> TemplateResolver {
    TemplateResolver::new(cluster.listers(), Arc::new(UnimplementedPlanResolver))
}

#[test]
fn test_explicit_plan_without_templates_resolves_to_empty() {
    let cluster = MemoryCluster::new();
    let mut instance = templated_instance("orders-db", "mysqldb");
    instance.spec.plan_reference = PlanReference::cluster_external("mysql-class", "free-plan");

    let template = resolver(&cluster).resolve_instance_template(&instance).unwrap();
    assert_eq!(template, Default::default());

    let applied = svcat_templates::builder::apply_instance_template(&instance, &template).unwrap();
    let provisioned = svcat_templates::builder::build_provisioned_instance(&applied).unwrap();
    assert_eq!(
        provisioned.spec.plan_reference,
        PlanReference::cluster_external("mysql-class", "free-plan")
    );
}

#[test]
fn test_missing_plan_without_templates_is_not_found() {
    let cluster = MemoryCluster::new();
    let instance = templated_instance("orders-db", "mysqldb");

    let err = resolver(&cluster).resolve_instance_template(&instance).unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { ref service_type } if service_type == "mysqldb"));
}

#[test]
fn test_namespace_tier_overrides_broker_tier() {
    let cluster = MemoryCluster::new();
    cluster.broker_instance_templates.insert(broker_template(
        "azure-mysql",
        "azure",
        "mysqldb",
        instance_payload(Some(("azure-mysql", "basic")), Some(json!({"region": "eastus"}))),
    ));
    cluster.instance_templates.insert(namespace_template(
        "shop-mysql",
        "mysqldb",
        instance_payload(None, Some(json!({"region": "westus", "tier": "standard"}))),
    ));

    let instance = templated_instance("orders-db", "mysqldb");
    let template = resolver(&cluster).resolve_instance_template(&instance).unwrap();

    assert_eq!(template.parameters, Some(json!({"region": "westus", "tier": "standard"})));
    assert_eq!(
        template.plan_reference,
        PlanReference::cluster_external("azure-mysql", "basic")
    );
}

#[test]
fn test_every_tier_contributes_disjoint_fields() {
    let cluster = MemoryCluster::new();
    cluster.broker_instance_templates.insert(broker_template(
        "azure-mysql",
        "azure",
        "mysqldb",
        instance_payload(None, Some(json!({"sku": "B1", "tier": "broker"}))),
    ));
    cluster.cluster_instance_templates.insert(cluster_template(
        "mysql-defaults",
        "mysqldb",
        instance_payload(Some(("mysql", "standard")), Some(json!({"backups": true, "tier": "cluster"}))),
    ));
    cluster.instance_templates.insert(namespace_template(
        "shop-mysql",
        "mysqldb",
        instance_payload(None, Some(json!({"owner": "shop"}))),
    ));

    let instance = templated_instance("orders-db", "mysqldb");
    let template = resolver(&cluster).resolve_instance_template(&instance).unwrap();

    assert_eq!(
        template.parameters,
        Some(json!({"sku": "B1", "backups": true, "owner": "shop", "tier": "cluster"}))
    );
}

#[test]
fn test_templates_of_other_service_types_are_ignored() {
    let cluster = MemoryCluster::new();
    cluster.cluster_instance_templates.insert(cluster_template(
        "redis-defaults",
        "redis",
        instance_payload(Some(("redis", "small")), None),
    ));

    let instance = templated_instance("orders-db", "mysqldb");
    let err = resolver(&cluster).resolve_instance_template(&instance).unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound { .. }));
}

#[test]
fn test_several_brokers_without_narrower_template_is_ambiguous() {
    let cluster = MemoryCluster::new();
    for broker in ["azure", "aws"] {
        cluster.broker_instance_templates.insert(broker_template(
            &format!("{broker}-mysql"),
            broker,
            "mysqldb",
            instance_payload(Some((broker, "basic")), None),
        ));
    }

    let instance = templated_instance("orders-db", "mysqldb");
    let err = resolver(&cluster).resolve_instance_template(&instance).unwrap_err();
    assert!(matches!(err, Error::AmbiguousTemplate { count: 2, .. }));
    assert!(err.is_retryable());
}

#[test]
fn test_narrower_template_disambiguates_brokers() {
    let cluster = MemoryCluster::new();
    for broker in ["azure", "aws"] {
        cluster.broker_instance_templates.insert(broker_template(
            &format!("{broker}-mysql"),
            broker,
            "mysqldb",
            instance_payload(Some((broker, "basic")), Some(json!({"broker": broker}))),
        ));
    }
    cluster.instance_templates.insert(namespace_template(
        "shop-mysql",
        "mysqldb",
        instance_payload(Some(("aws", "large")), None),
    ));

    let instance = templated_instance("orders-db", "mysqldb");
    let template = resolver(&cluster).resolve_instance_template(&instance).unwrap();

    assert_eq!(template.plan_reference, PlanReference::cluster_external("aws", "large"));
    assert_eq!(template.parameters, None, "broker tier is skipped when ambiguous");
}

#[test]
fn test_binding_template_follows_instance_service_type() {
    let cluster = MemoryCluster::new();
    cluster
        .templated_instances
        .insert(templated_instance("orders-db", "mysqldb"));
    cluster
        .binding_templates
        .insert(binding_template("mysql-keys", "mysqldb", &[("password", "db-password")]));
    cluster
        .binding_templates
        .insert(binding_template("redis-keys", "redis", &[("password", "redis-password")]));

    let binding = templated_binding("orders-creds", "orders-db");
    let template = resolver(&cluster).resolve_binding_template(&binding).unwrap();
    assert_eq!(
        template.secret_keys.get("password").map(String::as_str),
        Some("db-password")
    );
}

#[test]
fn test_binding_without_cached_instance_is_not_found() {
    let cluster = MemoryCluster::new();
    let binding = templated_binding("orders-creds", "ghost");
    let err = resolver(&cluster).resolve_binding_template(&binding).unwrap_err();
    assert!(err.is_not_found());
}
