//! # Order Relay Core
//!
//! Port traits for the sidecar primitives Order Relay is built on.
//!
//! The application never talks to a broker or a database directly. It talks
//! to a sidecar process that exposes pub/sub and key-value state as local
//! APIs. This crate names those capabilities as traits so the order pipeline
//! can be wired to the real sidecar client in production and to in-memory
//! doubles in tests.
//!
//! ## Modules
//!
//! - [`pubsub`]: publish payloads to a topic
//! - [`state_store`]: get/save/delete bytes by key
//! - [`event`]: the CloudEvent envelope deliveries arrive in
//! - [`subscription`]: subscriptions and delivery handlers
//! - [`health`]: named health checks polled by the sidecar
//!
//! ## Example
//!
//! ```ignore
//! use order_relay_core::pubsub::{PubSub, PublishRequest};
//! use order_relay_core::state_store::StateStore;
//!
//! async fn relay(
//!     bus: &dyn PubSub,
//!     store: &dyn StateStore,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     bus.publish(PublishRequest::json("pubsub", "orders", br#"{"id":"o1"}"#)).await?;
//!     let item = store.get("kvstore", "o1").await?;
//!     Ok(())
//! }
//! ```

pub mod event;
pub mod health;
pub mod pubsub;
pub mod state_store;
pub mod subscription;

pub use event::{EventError, TopicEvent};
pub use health::{AlwaysHealthy, HealthCheck};
pub use pubsub::{PubSub, PubSubError, PublishRequest};
pub use state_store::{StateItem, StateStore, StateStoreError};
pub use subscription::{DeliveryStatus, HandlerError, Subscription, TopicEventHandler};
