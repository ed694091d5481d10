//! Axum building blocks for Order Relay HTTP services.
//!
//! Keeps transport concerns out of the domain crates:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         HTTP shell (this crate)         │  ← JSON bodies, status codes
//! │  - Request parsing                      │  ← correlation IDs, tracing
//! │  - Error → response mapping             │  ← /healthz, /metrics
//! ├─────────────────────────────────────────┤
//! │         Domain (apps)                   │
//! │  - Validation and business operations   │
//! │  - Sidecar ports (pub/sub, state)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use order_relay_web::{AppError, JsonBody, propagate_correlation_id};
//! use axum::{Router, routing::post, Json};
//!
//! async fn create(JsonBody(order): JsonBody<Order>) -> Result<Json<Order>, AppError> {
//!     Ok(Json(order))
//! }
//!
//! let app = Router::new()
//!     .route("/v1/orders", post(create))
//!     .layer(axum::middleware::from_fn(propagate_correlation_id));
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::{AppError, panic_response};
pub use extractors::{CorrelationId, JsonBody};
pub use middleware::{CORRELATION_ID_HEADER, propagate_correlation_id};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
