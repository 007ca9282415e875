//! Business metrics for the Pickup backend.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `pickup_events_created_total` - Events created
//! - `pickup_events_removed_total` - Events removed by their host
//! - `pickup_event_joins_total` - Successful joins
//! - `pickup_event_leaves_total` - Successful leaves
//! - `pickup_status_transitions_total{from,to}` - Lifecycle transitions
//! - `pickup_notifications_enqueued_total{kind}` - Notifications enqueued

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Register descriptions for all business metrics.
///
/// Call once at startup, before any metric is recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "pickup_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "pickup_events_removed_total",
        "Total number of events removed by their host"
    );
    describe_counter!(
        "pickup_event_joins_total",
        "Total number of successful event joins"
    );
    describe_counter!(
        "pickup_event_leaves_total",
        "Total number of successful event leaves"
    );
    describe_counter!(
        "pickup_status_transitions_total",
        "Total number of lifecycle status transitions, labelled by edge"
    );
    describe_counter!(
        "pickup_notifications_enqueued_total",
        "Total number of notifications enqueued, labelled by kind"
    );

    info!("Business metrics registered");
}

/// Install the Prometheus exporter on `host:port`.
///
/// # Errors
///
/// Returns an error when the address is invalid or the exporter cannot
/// bind.
pub fn install_prometheus_exporter(host: &str, port: u16) -> anyhow::Result<()> {
    let address: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid metrics address {host}:{port}"))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(%address, "Prometheus exporter listening");
    Ok(())
}
