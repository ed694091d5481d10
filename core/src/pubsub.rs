//! Pub/sub abstraction for publishing order events through the sidecar.
//!
//! This module provides the [`PubSub`] trait. Publishing hands a payload to the
//! sidecar's pub/sub building block, which owns durability, fan-out and
//! redelivery. Subscribers never call this trait: the sidecar pushes deliveries
//! to the application's callback service (see [`crate::subscription`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   publish    ┌──────────────┐   deliver    ┌──────────────┐
//! │ Order Manager│─────────────►│   Sidecar    │─────────────►│  Subscriber  │
//! │   (Create)   │              │ (pub/sub bb) │  CloudEvent  │ (OnNewOrder) │
//! └──────────────┘              └──────────────┘              └──────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **At-least-once delivery**: the sidecar may deliver a message more than once
//! - **Idempotency**: subscribers must tolerate duplicates
//! - **No local retry**: a failed publish is reported to the caller as-is
//!
//! # Implementations
//!
//! - `DaprClient` (order-relay-dapr) - production, talks to the sidecar over HTTP
//! - `InMemoryPubSub` (order-relay-testing) - records published messages for tests

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Content type used for JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors that can occur during pub/sub operations.
#[derive(Error, Debug, Clone)]
pub enum PubSubError {
    /// Failed to reach the sidecar
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The sidecar rejected the message
    #[error("Publish failed for {pubsub_name}/{topic}: {reason}")]
    PublishFailed {
        /// The pub/sub component name
        pubsub_name: String,
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Request timed out
    #[error("Publish to {pubsub_name}/{topic} timed out")]
    Timeout {
        /// The pub/sub component name
        pubsub_name: String,
        /// The topic that timed out
        topic: String,
    },
}

/// A message to publish.
///
/// Borrowed so callers can publish without copying the payload.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Pub/sub component name configured in the sidecar (e.g., "pubsub")
    pub pubsub_name: &'a str,
    /// Topic to publish to (e.g., "orders")
    pub topic: &'a str,
    /// Payload bytes
    pub data: &'a [u8],
    /// MIME type of `data`
    pub content_type: &'a str,
}

impl<'a> PublishRequest<'a> {
    /// Create a JSON publish request.
    #[must_use]
    pub const fn json(pubsub_name: &'a str, topic: &'a str, data: &'a [u8]) -> Self {
        Self {
            pubsub_name,
            topic,
            data,
            content_type: CONTENT_TYPE_JSON,
        }
    }
}

/// Trait for pub/sub implementations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// (`Arc<dyn PubSub>`) by every request handler.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be used as a trait object.
///
/// # Example
///
/// ```rust,ignore
/// let payload = serde_json::to_vec(&order)?;
/// pubsub
///     .publish(PublishRequest::json("pubsub", "orders", &payload))
///     .await?;
/// ```
pub trait PubSub: Send + Sync {
    /// Publish a message to a topic.
    ///
    /// Resolves once the sidecar has accepted the message; delivery to
    /// subscribers happens asynchronously afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`PubSubError::PublishFailed`] if the sidecar rejects the
    /// message, [`PubSubError::ConnectionFailed`] if it cannot be reached and
    /// [`PubSubError::Timeout`] if it does not answer in time.
    fn publish<'a>(
        &'a self,
        request: PublishRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PubSubError>> + Send + 'a>>;
}
