//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `svcat_templates_reconciliations_total{kind}` - Synchronizations started
//! - `svcat_templates_reconciliation_errors_total{kind,reason}` - Failed synchronizations
//! - `svcat_templates_reconciliation_duration_seconds{kind}` - Duration of one synchronization
//! - `svcat_templates_requeues_total{kind}` - Failed objects requeued with backoff
//! - `svcat_templates_writes_total{kind,operation}` - Creates and updates of provisioned objects
//! - `svcat_templates_unmanaged_conflicts_total{kind}` - Provisioned objects owned by someone else
//! - `svcat_templates_templates_resolved_total{tier}` - Template tiers folded into effective templates

use crate::crd::TemplateTier;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_reconciliations_total",
            "Total number of synchronizations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_reconciliation_errors_total",
            "Total number of failed synchronizations by resource kind and error reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "svcat_templates_reconciliation_duration_seconds",
            "Duration of synchronization in seconds by resource kind",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_requeues_total",
            "Total number of keys requeued with backoff by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static WRITES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_writes_total",
            "Total number of provisioned objects created or updated",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create WRITES_TOTAL metric - this should never happen")
});

static UNMANAGED_CONFLICTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_unmanaged_conflicts_total",
            "Total number of provisioned objects found under another controller",
        ),
        &["kind"],
    )
    .expect("Failed to create UNMANAGED_CONFLICTS_TOTAL metric - this should never happen")
});

static TEMPLATES_RESOLVED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "svcat_templates_templates_resolved_total",
            "Total number of template tiers folded into effective templates",
        ),
        &["tier"],
    )
    .expect("Failed to create TEMPLATES_RESOLVED_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails when called twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UNMANAGED_CONFLICTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TEMPLATES_RESOLVED_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues(kind: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a create or update of a provisioned object
pub fn record_write(kind: &str, operation: &str) {
    WRITES_TOTAL.with_label_values(&[kind, operation]).inc();
}

pub fn increment_unmanaged_conflicts(kind: &str) {
    UNMANAGED_CONFLICTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_templates_resolved(tier: TemplateTier) {
    TEMPLATES_RESOLVED_TOTAL
        .with_label_values(&[tier.as_str()])
        .inc();
}
