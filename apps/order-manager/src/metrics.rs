//! Business metrics for the order manager.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `orders_created_total` - Orders accepted and published
//! - `orders_ingested_total` - Orders persisted from delivered events
//! - `orders_deleted_total` - Orders removed from the state store
//! - `order_operation_errors_total{operation}` - Failed manager operations
//!
//! Sidecar-level metrics (publish and state store latency) are recorded by
//! the Dapr client.

use metrics::{counter, describe_counter};

/// Register all business metric descriptions.
///
/// Call once at startup after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "orders_created_total",
        "Total number of orders accepted and published"
    );
    describe_counter!(
        "orders_ingested_total",
        "Total number of orders persisted from delivered events"
    );
    describe_counter!(
        "orders_deleted_total",
        "Total number of orders deleted"
    );
    describe_counter!(
        "order_operation_errors_total",
        "Total number of failed order operations by operation (create, ingest, get, delete)"
    );
}

/// Order operation recorder.
pub struct OrderMetrics;

impl OrderMetrics {
    /// Record an accepted order.
    pub fn record_created() {
        counter!("orders_created_total").increment(1);
    }

    /// Record a persisted order.
    pub fn record_ingested() {
        counter!("orders_ingested_total").increment(1);
    }

    /// Record a deleted order.
    pub fn record_deleted() {
        counter!("orders_deleted_total").increment(1);
    }

    /// Record a failed operation.
    pub fn record_error(operation: &'static str) {
        counter!("order_operation_errors_total", "operation" => operation).increment(1);
    }
}
