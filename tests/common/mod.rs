//! Common test utilities
//!
//! Fixtures for templated resources and templates, plus an event recorder that
//! keeps what it was given so tests can assert on user-visible warnings.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::ByteString;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use svcat_templates::constants::SERVICE_TYPE_LABEL;
use svcat_templates::controller::{EventRecorder, Synchronizer};
use svcat_templates::crd::{
    BindingTemplate, BindingTemplateSpec, BrokerInstanceTemplate, BrokerInstanceTemplateSpec,
    ClusterInstanceTemplate, ClusterInstanceTemplateSpec, InstanceTemplate, InstanceTemplateSpec,
    LocalObjectReference, PlanReference, TemplatedBinding, TemplatedBindingSpec,
    TemplatedInstance, TemplatedInstanceSpec,
};
use svcat_templates::store::memory::MemoryCluster;
use svcat_templates::template::UnimplementedPlanResolver;

pub const NAMESPACE: &str = "shop";

/// One recorded warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub reason: String,
    pub note: String,
}

/// Event recorder that keeps every warning in memory
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRecorder for RecordingEvents {
    async fn warning(&self, object: &ObjectReference, reason: &str, note: &str) {
        self.events.lock().unwrap().push(RecordedEvent {
            kind: object.kind.clone(),
            name: object.name.clone(),
            reason: reason.to_string(),
            note: note.to_string(),
        });
    }
}

/// Synchronizer over `cluster`, returning the recorder it reports to
pub fn synchronizer(cluster: &MemoryCluster) -> (Synchronizer, Arc<RecordingEvents>) {
    let events = Arc::new(RecordingEvents::default());
    let synchronizer = Synchronizer::new(
        cluster.listers(),
        cluster.clients(),
        Arc::new(UnimplementedPlanResolver),
        Arc::clone(&events) as Arc<dyn EventRecorder>,
    );
    (synchronizer, events)
}

pub fn service_type_labels(service_type: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from([(
        SERVICE_TYPE_LABEL.to_string(),
        service_type.to_string(),
    )]))
}

pub fn templated_instance(name: &str, service_type: &str) -> TemplatedInstance {
    let mut instance = TemplatedInstance::new(
        name,
        TemplatedInstanceSpec {
            service_type: service_type.to_string(),
            ..TemplatedInstanceSpec::default()
        },
    );
    instance.metadata.namespace = Some(NAMESPACE.to_string());
    instance
}

pub fn templated_binding(name: &str, instance: &str) -> TemplatedBinding {
    let mut binding = TemplatedBinding::new(
        name,
        TemplatedBindingSpec {
            instance_ref: LocalObjectReference {
                name: instance.to_string(),
            },
            ..TemplatedBindingSpec::default()
        },
    );
    binding.metadata.namespace = Some(NAMESPACE.to_string());
    binding
}

pub fn instance_payload(plan: Option<(&str, &str)>, parameters: Option<Value>) -> InstanceTemplateSpec {
    InstanceTemplateSpec {
        plan_reference: plan
            .map(|(class, plan)| PlanReference::cluster_external(class, plan))
            .unwrap_or_default(),
        parameters,
        ..InstanceTemplateSpec::default()
    }
}

pub fn namespace_template(name: &str, service_type: &str, payload: InstanceTemplateSpec) -> InstanceTemplate {
    let mut template = InstanceTemplate::new(name, payload);
    template.metadata.namespace = Some(NAMESPACE.to_string());
    template.metadata.labels = service_type_labels(service_type);
    template
}

pub fn cluster_template(
    name: &str,
    service_type: &str,
    payload: InstanceTemplateSpec,
) -> ClusterInstanceTemplate {
    let mut template = ClusterInstanceTemplate::new(
        name,
        ClusterInstanceTemplateSpec { template: payload },
    );
    template.metadata.labels = service_type_labels(service_type);
    template
}

pub fn broker_template(
    name: &str,
    broker: &str,
    service_type: &str,
    payload: InstanceTemplateSpec,
) -> BrokerInstanceTemplate {
    let mut template = BrokerInstanceTemplate::new(
        name,
        BrokerInstanceTemplateSpec {
            broker_name: broker.to_string(),
            template: payload,
        },
    );
    template.metadata.labels = service_type_labels(service_type);
    template
}

pub fn binding_template(name: &str, service_type: &str, renames: &[(&str, &str)]) -> BindingTemplate {
    let mut template = BindingTemplate::new(
        name,
        BindingTemplateSpec {
            secret_keys: renames
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
            ..BindingTemplateSpec::default()
        },
    );
    template.metadata.namespace = Some(NAMESPACE.to_string());
    template.metadata.labels = service_type_labels(service_type);
    template
}

pub fn secret_data(pairs: &[(&str, &str)]) -> BTreeMap<String, ByteString> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), ByteString(value.as_bytes().to_vec())))
        .collect()
}

pub fn secret(name: &str, pairs: &[(&str, &str)]) -> Secret {
    let mut secret = Secret {
        data: Some(secret_data(pairs)),
        ..Secret::default()
    };
    secret.metadata.name = Some(name.to_string());
    secret.metadata.namespace = Some(NAMESPACE.to_string());
    secret
}
