//! Prometheus metrics for observability and monitoring.
//!
//! This module installs the global `metrics` recorder backed by
//! `metrics-exporter-prometheus` and describes the metrics emitted by the
//! sidecar adapters:
//! - Pub/sub publishes
//! - State store operations
//! - Topic deliveries handled by the callback service
//!
//! The exporter does not open its own listener; the application renders the
//! [`PrometheusHandle`] from its `/metrics` route.
//!
//! # Example
//!
//! ```rust,no_run
//! use order_relay_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//! let text = recorder.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Handle to the installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// Install the global Prometheus recorder and register metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a recorder is already installed
    /// in this process, or [`MetricsError::Build`] if the exporter
    /// configuration is rejected.
    pub fn install() -> Result<Self, MetricsError> {
        let handle = PrometheusBuilder::new()
            // Configure histogram buckets for latency measurements
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        tracing::info!("Prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Build a recorder that is *not* installed globally.
    ///
    /// Metrics recorded through the `metrics` macros will not show up in its
    /// output; intended for tests that only need a renderable handle.
    #[must_use]
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Render current metrics in Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Pub/sub metrics
    describe_counter!(
        "pubsub_messages_published_total",
        "Total number of messages accepted by the sidecar pub/sub"
    );
    describe_counter!(
        "pubsub_publish_errors_total",
        "Total number of publish failures"
    );
    describe_histogram!(
        "pubsub_publish_duration_seconds",
        "Time taken to publish a message"
    );

    // State store metrics
    describe_counter!(
        "state_store_operations_total",
        "Total number of state store operations by kind (get, save, delete)"
    );
    describe_counter!(
        "state_store_errors_total",
        "Total number of failed state store operations by kind"
    );
    describe_histogram!(
        "state_store_operation_duration_seconds",
        "Time taken by a state store operation"
    );

    // Delivery metrics
    describe_counter!(
        "topic_deliveries_total",
        "Total number of topic deliveries handled, by status (SUCCESS, RETRY, DROP)"
    );
}

/// Pub/sub metrics recorder.
pub struct PubSubMetrics;

impl PubSubMetrics {
    /// Record a message publish.
    pub fn record_publish(topic: &str, duration: Duration) {
        counter!("pubsub_messages_published_total", "topic" => topic.to_owned()).increment(1);
        histogram!("pubsub_publish_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a publish error.
    pub fn record_publish_error(topic: &str) {
        counter!("pubsub_publish_errors_total", "topic" => topic.to_owned()).increment(1);
    }
}

/// State store metrics recorder.
pub struct StateStoreMetrics;

impl StateStoreMetrics {
    /// Record a completed operation (`get`, `save`, `delete`).
    pub fn record_operation(op: &'static str, duration: Duration) {
        counter!("state_store_operations_total", "op" => op).increment(1);
        histogram!("state_store_operation_duration_seconds", "op" => op)
            .record(duration.as_secs_f64());
    }

    /// Record a failed operation.
    pub fn record_error(op: &'static str) {
        counter!("state_store_errors_total", "op" => op).increment(1);
    }
}

/// Topic delivery metrics recorder.
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record a handled delivery with the status reported to the sidecar.
    pub fn record_delivery(topic: &str, status: &'static str) {
        counter!(
            "topic_deliveries_total",
            "topic" => topic.to_owned(),
            "status" => status
        )
        .increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn test_detached_recorder_renders() {
        let recorder = MetricsRecorder::detached();
        // Nothing recorded through this handle, but rendering must not fail.
        let _ = recorder.render();
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        PubSubMetrics::record_publish("orders", Duration::from_millis(5));
        PubSubMetrics::record_publish_error("orders");
        StateStoreMetrics::record_operation("get", Duration::from_millis(1));
        StateStoreMetrics::record_error("save");
        DeliveryMetrics::record_delivery("orders", "SUCCESS");
    }

    #[test]
    fn test_install_and_render() {
        // Only one recorder can be installed per process; this is the only
        // test in this crate that installs it.
        let recorder = MetricsRecorder::install().unwrap();
        PubSubMetrics::record_publish("orders", Duration::from_millis(50));
        StateStoreMetrics::record_operation("save", Duration::from_millis(2));

        let rendered = recorder.render();
        assert!(rendered.contains("pubsub_messages_published_total"));
        assert!(rendered.contains("state_store_operations_total"));
    }
}
