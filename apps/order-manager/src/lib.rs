//! # Order Manager
//!
//! HTTP API for purchase orders, relayed through a Dapr sidecar.
//!
//! ```text
//! POST /v1/orders ─▶ OrderManager::create ─▶ publish(pubsub, topic)
//!                                                   │ sidecar
//!                                                   ▼
//! GET  /v1/orders/:id ◀─ state store ◀─ save ◀─ POST /pubsub/neworder
//! ```
//!
//! The order manager owns no durable state; delivery, durability and
//! redelivery are the sidecar's.
//!
//! ## Modules
//!
//! - [`config`]: layered TOML/environment configuration
//! - [`order`]: the order entity and its validation
//! - [`manager`]: order operations on top of the sidecar ports
//! - [`subscriber`]: topic handler feeding deliveries into the manager
//! - [`api`] / [`router`]: the public HTTP surface
//! - [`app`]: bootstrap and graceful shutdown

pub mod api;
pub mod app;
pub mod config;
pub mod manager;
pub mod metrics;
pub mod order;
pub mod router;
pub mod subscriber;
pub mod telemetry;

pub use app::{Application, build_callback_router, sidecar_manager};
pub use config::{Config, ConfigError};
pub use manager::{OrderError, OrderManager, SidecarComponents, SidecarOrderManager};
pub use order::{Order, ValidationError};
pub use router::{AppState, build_router};
pub use subscriber::{NEW_ORDER_ROUTE, NewOrderHandler};
