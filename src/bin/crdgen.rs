//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of the templating API group as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/templates.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! `ServiceInstance` and `ServiceBinding` belong to the service catalog and are
//! not emitted.

use kube::core::CustomResourceExt;
use svcat_templates::crd::{
    BindingTemplate, BrokerBindingTemplate, BrokerInstanceTemplate, ClusterBindingTemplate,
    ClusterInstanceTemplate, InstanceTemplate, TemplatedBinding, TemplatedInstance,
};

fn main() {
    let crds = [
        TemplatedInstance::crd(),
        TemplatedBinding::crd(),
        InstanceTemplate::crd(),
        ClusterInstanceTemplate::crd(),
        BrokerInstanceTemplate::crd(),
        BindingTemplate::crd(),
        ClusterBindingTemplate::crd(),
        BrokerBindingTemplate::crd(),
    ];

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Change the types under src/crd/ instead");
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
