//! # Order Relay Dapr
//!
//! Adapters between Order Relay and a Dapr sidecar.
//!
//! - [`DaprClient`]: implements the [`PubSub`](order_relay_core::PubSub) and
//!   [`StateStore`](order_relay_core::StateStore) ports over the sidecar's
//!   HTTP API.
//! - [`CallbackService`]: the axum router the sidecar calls to discover
//!   subscriptions, deliver topic events and probe app health.

pub mod client;
pub mod error;
pub mod service;

pub use client::{API_TOKEN_HEADER, DEFAULT_ENDPOINT, DaprClient, DaprClientBuilder};
pub use error::DaprError;
pub use service::CallbackService;
