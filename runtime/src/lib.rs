//! # Order Relay Runtime
//!
//! Process-level support shared by Order Relay services.
//!
//! ## Components
//!
//! - **Metrics**: global Prometheus recorder and recorder structs for the
//!   sidecar adapters ([`metrics`])
//! - **Shutdown**: signal handling and shutdown fan-out for servers and
//!   background tasks ([`shutdown`])

/// Prometheus metrics for observability
pub mod metrics;

/// Graceful shutdown coordination
pub mod shutdown;

pub use metrics::{MetricsError, MetricsRecorder};
pub use shutdown::{ShutdownCoordinator, ShutdownListener, join_with_timeout, wait_for_signal};
