//! Key-value state abstraction backed by the sidecar's state building block.
//!
//! The store component (Redis, Cosmos DB, ...) is configured in the sidecar;
//! the application only sees string keys and opaque byte values. Consistency,
//! TTL and concurrency semantics are owned by the component.
//!
//! # Implementations
//!
//! - `DaprClient` (order-relay-dapr) - production
//! - `InMemoryStateStore` (order-relay-testing) - `HashMap`-backed, for tests

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during state store operations.
#[derive(Error, Debug, Clone)]
pub enum StateStoreError {
    /// Failed to reach the sidecar
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The sidecar or the store component reported a failure
    #[error("State store '{store_name}' failed on key '{key}': {reason}")]
    OperationFailed {
        /// The store component name
        store_name: String,
        /// The key being accessed
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// Request timed out
    #[error("State store '{store_name}' timed out on key '{key}'")]
    Timeout {
        /// The store component name
        store_name: String,
        /// The key being accessed
        key: String,
    },
}

/// A value read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateItem {
    /// The key the value was stored under
    pub key: String,
    /// Raw value bytes
    pub value: Vec<u8>,
    /// Concurrency tag reported by the store, if any
    pub etag: Option<String>,
}

impl StateItem {
    /// Create a state item without an `ETag`.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
            etag: None,
        }
    }

    /// Attach an `ETag`.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Trait for key-value state store implementations.
///
/// All operations address a named store component so one client can serve
/// several components.
///
/// # Dyn Compatibility
///
/// Like [`crate::pubsub::PubSub`], methods return boxed futures so the trait
/// can be used as `Arc<dyn StateStore>`.
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent. A key holding an empty value
    /// is reported as absent too, matching the sidecar's behaviour.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] if the store cannot be read.
    fn get<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StateItem>, StateStoreError>> + Send + 'a>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] if the write is rejected.
    fn save<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StateStoreError>> + Send + 'a>>;

    /// Remove `key`.
    ///
    /// Resolves to `true` when a value was removed and `false` when the key
    /// was already absent.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] if the delete is rejected.
    fn delete<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StateStoreError>> + Send + 'a>>;
}
