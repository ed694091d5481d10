//! Topic subscriptions and delivery handlers.
//!
//! The sidecar discovers what the application wants to receive by asking the
//! callback service for its [`Subscription`]s, then pushes every message to the
//! subscription's route. A [`TopicEventHandler`] is the callback bound to one
//! `(pubsub, topic, route)` triple.
//!
//! # Delivery Outcome
//!
//! The handler's result decides what the sidecar does with the message:
//!
//! ```text
//! Ok(())                            → SUCCESS  (acknowledged)
//! Err(e) where e.should_retry()     → RETRY    (sidecar redelivers)
//! Err(e) where !e.should_retry()    → DROP     (sidecar discards / dead-letters)
//! ```
//!
//! Redelivery timing and limits belong to the sidecar's resiliency policy.

use crate::event::TopicEvent;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A declarative subscription advertised to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Pub/sub component name
    #[serde(rename = "pubsubname")]
    pub pubsub_name: String,
    /// Topic to receive
    pub topic: String,
    /// Application route the sidecar POSTs deliveries to
    pub route: String,
}

impl Subscription {
    /// Create a subscription.
    #[must_use]
    pub fn new(
        pubsub_name: impl Into<String>,
        topic: impl Into<String>,
        route: impl Into<String>,
    ) -> Self {
        Self {
            pubsub_name: pubsub_name.into(),
            topic: topic.into(),
            route: route.into(),
        }
    }
}

/// Errors reported by a [`TopicEventHandler`].
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// The payload could not be decoded into the expected type.
    #[error("Invalid payload in event {event_id}: {reason}")]
    InvalidPayload {
        /// Id of the offending event
        event_id: String,
        /// Decoder message
        reason: String,
    },

    /// Processing a well-formed payload failed.
    #[error("Failed to process event {event_id}: {reason}")]
    Processing {
        /// Id of the event being processed
        event_id: String,
        /// Underlying failure
        reason: String,
        /// Whether the sidecar should redeliver
        retry: bool,
    },
}

impl HandlerError {
    /// Whether the message should be requeued by the sidecar.
    ///
    /// Malformed payloads never are: redelivering them cannot succeed.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        match self {
            Self::InvalidPayload { .. } => false,
            Self::Processing { retry, .. } => *retry,
        }
    }
}

/// Status returned to the sidecar for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    /// Message processed; acknowledge it
    Success,
    /// Message should be redelivered
    Retry,
    /// Message should be discarded
    Drop,
}

impl DeliveryStatus {
    /// Map a handler result to the status reported to the sidecar.
    #[must_use]
    pub const fn from_result(result: &Result<(), HandlerError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) if e.should_retry() => Self::Retry,
            Err(_) => Self::Drop,
        }
    }

    /// Wire representation (`SUCCESS`, `RETRY`, `DROP`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Retry => "RETRY",
            Self::Drop => "DROP",
        }
    }
}

/// Callback bound to one subscription.
///
/// # Example
///
/// ```rust,ignore
/// struct AuditHandler { subscription: Subscription }
///
/// impl TopicEventHandler for AuditHandler {
///     fn subscription(&self) -> &Subscription {
///         &self.subscription
///     }
///
///     fn handle<'a>(&'a self, event: &'a TopicEvent)
///         -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>
///     {
///         Box::pin(async move {
///             tracing::info!(%event, "audited");
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait TopicEventHandler: Send + Sync {
    /// The subscription this handler serves.
    fn subscription(&self) -> &Subscription;

    /// Process one delivered event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the event cannot be processed; see
    /// [`HandlerError::should_retry`] for the redelivery decision.
    fn handle<'a>(
        &'a self,
        event: &'a TopicEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;
}
