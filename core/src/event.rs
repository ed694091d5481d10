//! Topic event envelope delivered by the sidecar.
//!
//! When the sidecar delivers a message published to a topic, it wraps the
//! payload in a [CloudEvents 1.0](https://cloudevents.io) envelope. This module
//! models the subset of that envelope the application reads.
//!
//! # Payload Encoding
//!
//! Payloads published with `Content-Type: application/json` arrive with the
//! JSON document inlined in the `data` field. Anything else arrives as a JSON
//! string. [`TopicEvent::raw_data`] hides that difference and always returns
//! the payload bytes as they were published.
//!
//! # Example
//!
//! ```
//! use order_relay_core::event::TopicEvent;
//!
//! let body = br#"{
//!     "id": "5929aaac-a5e2-4ca1-859c-edfe73f11565",
//!     "source": "order-manager",
//!     "type": "com.dapr.event.sent",
//!     "specversion": "1.0",
//!     "datacontenttype": "application/json",
//!     "pubsubname": "pubsub",
//!     "topic": "orders",
//!     "data": {"id": "o1", "item": "widget"}
//! }"#;
//!
//! let event = TopicEvent::from_slice(body).unwrap();
//! assert_eq!(event.topic, "orders");
//! assert_eq!(event.raw_data().unwrap(), br#"{"id":"o1","item":"widget"}"#.to_vec());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error types for envelope decoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// The request body is not a valid CloudEvent envelope.
    #[error("Invalid topic event envelope: {0}")]
    InvalidEnvelope(String),

    /// The envelope carries no payload.
    #[error("Topic event {0} has no data")]
    MissingData(String),

    /// The payload could not be re-encoded to bytes.
    #[error("Failed to encode topic event data: {0}")]
    DataEncoding(String),
}

/// A message delivered from a pub/sub topic.
///
/// Field names follow the CloudEvents JSON format used by the sidecar.
/// Unknown envelope attributes (`traceparent`, `tracestate`, ...) are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicEvent {
    /// Unique event identifier assigned by the publisher's sidecar.
    pub id: String,

    /// Identifies the context in which the event happened (usually the app id).
    #[serde(default)]
    pub source: String,

    /// CloudEvent type (e.g., `com.dapr.event.sent`).
    #[serde(rename = "type", default)]
    pub event_type: String,

    /// CloudEvents spec version.
    #[serde(default = "default_spec_version")]
    pub specversion: String,

    /// Content type of `data`.
    #[serde(default)]
    pub datacontenttype: Option<String>,

    /// Name of the pub/sub component the event came through.
    #[serde(default)]
    pub pubsubname: String,

    /// Topic the event was published to.
    #[serde(default)]
    pub topic: String,

    /// Event payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn default_spec_version() -> String {
    "1.0".to_string()
}

impl TopicEvent {
    /// Decode an envelope from a delivery request body.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidEnvelope`] if the body is not a JSON object
    /// carrying at least an `id`.
    pub fn from_slice(body: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(body).map_err(|e| EventError::InvalidEnvelope(e.to_string()))
    }

    /// Return the payload bytes as they were published.
    ///
    /// JSON payloads are re-encoded compactly; string payloads are returned
    /// as their UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MissingData`] when the envelope has no payload
    /// and [`EventError::DataEncoding`] if a JSON payload cannot be encoded.
    pub fn raw_data(&self) -> Result<Vec<u8>, EventError> {
        match &self.data {
            None | Some(serde_json::Value::Null) => Err(EventError::MissingData(self.id.clone())),
            Some(serde_json::Value::String(text)) => Ok(text.clone().into_bytes()),
            Some(value) => {
                serde_json::to_vec(value).map_err(|e| EventError::DataEncoding(e.to_string()))
            }
        }
    }
}

impl fmt::Display for TopicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TopicEvent {{ id: {}, pubsub: {}, topic: {} }}",
            self.id, self.pubsubname, self.topic
        )
    }
}
