//! In-memory sidecar doubles.
//!
//! Both doubles are cheap to clone (`Arc` inside) so a test can keep a handle
//! for assertions while the code under test owns another.

use order_relay_core::event::TopicEvent;
use order_relay_core::pubsub::{CONTENT_TYPE_JSON, PubSub, PubSubError, PublishRequest};
use order_relay_core::state_store::{StateItem, StateStore, StateStoreError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A message captured by [`InMemoryPubSub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Pub/sub component name
    pub pubsub_name: String,
    /// Topic
    pub topic: String,
    /// Payload bytes
    pub data: Vec<u8>,
    /// Payload MIME type
    pub content_type: String,
}

impl PublishedMessage {
    /// Wrap this message in the CloudEvent envelope the sidecar would deliver.
    ///
    /// JSON payloads are inlined as JSON; anything else (or JSON that does not
    /// parse) is delivered as a string, as the sidecar does.
    #[must_use]
    pub fn to_topic_event(&self) -> TopicEvent {
        let data = if self.content_type == CONTENT_TYPE_JSON {
            serde_json::from_slice(&self.data).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&self.data).into_owned())
            })
        } else {
            serde_json::Value::String(String::from_utf8_lossy(&self.data).into_owned())
        };

        TopicEvent {
            id: uuid::Uuid::new_v4().to_string(),
            source: "order-relay-testing".to_string(),
            event_type: "com.dapr.event.sent".to_string(),
            specversion: "1.0".to_string(),
            datacontenttype: Some(self.content_type.clone()),
            pubsubname: self.pubsub_name.clone(),
            topic: self.topic.clone(),
            data: Some(data),
        }
    }

    /// Serialize the delivery envelope to a request body.
    #[must_use]
    pub fn to_delivery_body(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_topic_event()).unwrap_or_default()
    }
}

#[derive(Default)]
struct PubSubInner {
    published: Vec<PublishedMessage>,
    failure: Option<String>,
}

/// Pub/sub double that records every published message.
///
/// Nothing is delivered automatically: tests call [`take_published`] and feed
/// the messages to the subscriber, which makes the pending window between
/// publish and ingestion explicit.
///
/// [`take_published`]: InMemoryPubSub::take_published
#[derive(Clone, Default)]
pub struct InMemoryPubSub {
    inner: Arc<Mutex<PubSubInner>>,
}

impl InMemoryPubSub {
    /// Create an empty pub/sub double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        lock(&self.inner).failure = Some(reason.into());
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        lock(&self.inner).failure = None;
    }

    /// Messages published so far (without draining them).
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.inner).published.clone()
    }

    /// Drain and return the messages published so far.
    #[must_use]
    pub fn take_published(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut lock(&self.inner).published)
    }
}

impl PubSub for InMemoryPubSub {
    fn publish<'a>(
        &'a self,
        request: PublishRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PubSubError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = lock(&self.inner);
            if let Some(reason) = &inner.failure {
                return Err(PubSubError::PublishFailed {
                    pubsub_name: request.pubsub_name.to_string(),
                    topic: request.topic.to_string(),
                    reason: reason.clone(),
                });
            }
            inner.published.push(PublishedMessage {
                pubsub_name: request.pubsub_name.to_string(),
                topic: request.topic.to_string(),
                data: request.data.to_vec(),
                content_type: request.content_type.to_string(),
            });
            Ok(())
        })
    }
}

#[derive(Default)]
struct StateInner {
    stores: HashMap<String, HashMap<String, (Vec<u8>, u64)>>,
    failure: Option<String>,
}

/// `HashMap`-backed state store double.
///
/// Every write bumps a per-key version that is reported as the `ETag`.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<Mutex<StateInner>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        lock(&self.inner).failure = Some(reason.into());
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        lock(&self.inner).failure = None;
    }

    /// Write raw bytes directly, bypassing the trait (for seeding corrupt data).
    pub fn insert_raw(&self, store_name: &str, key: &str, value: Vec<u8>) {
        let mut inner = lock(&self.inner);
        let entry = inner
            .stores
            .entry(store_name.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| (Vec::new(), 0));
        entry.0 = value;
        entry.1 += 1;
    }

    /// Number of keys held in `store_name`.
    #[must_use]
    pub fn len(&self, store_name: &str) -> usize {
        lock(&self.inner).stores.get(store_name).map_or(0, HashMap::len)
    }

    /// Whether `store_name` holds no keys.
    #[must_use]
    pub fn is_empty(&self, store_name: &str) -> bool {
        self.len(store_name) == 0
    }

    fn check(inner: &StateInner, store_name: &str, key: &str) -> Result<(), StateStoreError> {
        match &inner.failure {
            Some(reason) => Err(StateStoreError::OperationFailed {
                store_name: store_name.to_string(),
                key: key.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl StateStore for InMemoryStateStore {
    fn get<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StateItem>, StateStoreError>> + Send + 'a>>
    {
        Box::pin(async move {
            let inner = lock(&self.inner);
            Self::check(&inner, store_name, key)?;
            Ok(inner
                .stores
                .get(store_name)
                .and_then(|store| store.get(key))
                .filter(|(value, _)| !value.is_empty())
                .map(|(value, version)| {
                    StateItem::new(key, value.clone()).with_etag(version.to_string())
                }))
        })
    }

    fn save<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StateStoreError>> + Send + 'a>> {
        Box::pin(async move {
            {
                let inner = lock(&self.inner);
                Self::check(&inner, store_name, key)?;
            }
            self.insert_raw(store_name, key, value);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StateStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = lock(&self.inner);
            Self::check(&inner, store_name, key)?;
            Ok(inner
                .stores
                .get_mut(store_name)
                .and_then(|store| store.remove(key))
                .is_some_and(|(value, _)| !value.is_empty()))
        })
    }
}
