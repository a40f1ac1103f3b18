//! # Service Catalog Templates Controller
//!
//! A Kubernetes controller that turns `TemplatedInstance` and `TemplatedBinding`
//! resources into service catalog `ServiceInstance` and `ServiceBinding` resources.
//!
//! ## Overview
//!
//! 1. **Resolving templates** - Broker, cluster and namespace templates labelled with the
//!    instance's service type are merged, narrowest tier last
//! 2. **Provisioning** - The merged defaults fill in the plan and parameters of a
//!    provisioned instance or binding owned by the templated resource
//! 3. **Republishing credentials** - Binding secrets are copied to the requested name
//!    with keys renamed per `secretKeys`
//!
//! ## Features
//!
//! - **Drift correction**: Parameter changes on provisioned resources are reverted
//! - **Ownership safety**: Resources controlled by anything else are never modified
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health checks**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use svcat_templates::runtime::{controller, initialization};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;
    controller::run(init).await
}
