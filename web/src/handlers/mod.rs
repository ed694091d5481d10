//! Shared HTTP handlers.

pub mod health;
pub mod metrics;

pub use health::healthz;
pub use metrics::render_metrics;
