//! Order manager: the order lifecycle on top of the sidecar ports.
//!
//! # Lifecycle
//!
//! ```text
//!  create ──publish──▶ (pending: on the topic, not readable)
//!                         │ sidecar delivers to the subscriber
//!                         ▼
//!  on_new_order ──save──▶ (present: get returns it)
//!                         │
//!  delete ──remove──────▶ (absent: get returns NotFound)
//! ```
//!
//! `create` never writes state, and `on_new_order` is the only write path, so
//! an order becomes readable only after its creation event has been delivered
//! and ingested. Nothing about the pending phase is stored.

use crate::config::Config;
use crate::metrics::OrderMetrics;
use crate::order::{Order, ValidationError};
use async_trait::async_trait;
use order_relay_core::pubsub::{PubSub, PubSubError, PublishRequest};
use order_relay_core::state_store::{StateStore, StateStoreError};
use std::sync::Arc;
use thiserror::Error;

/// Errors from order operations.
#[derive(Error, Debug)]
pub enum OrderError {
    /// No order is stored under this id
    #[error("order {0} not found")]
    NotFound(String),

    /// The order failed field validation
    #[error("invalid order: {0}")]
    Invalid(#[from] ValidationError),

    /// The order could not be encoded
    #[error("failed to serialize order {id}: {source}")]
    Serialization {
        /// Order id
        id: String,
        /// Encoder error
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes are not a valid order
    #[error("failed to deserialize order {id}: {source}")]
    Deserialization {
        /// Order id
        id: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The creation event could not be published
    #[error("failed to publish order {id}: {source}")]
    Publish {
        /// Order id
        id: String,
        /// Pub/sub error
        #[source]
        source: PubSubError,
    },

    /// The state store could not be read
    #[error("failed to read order {id}: {source}")]
    StoreRead {
        /// Order id
        id: String,
        /// State store error
        #[source]
        source: StateStoreError,
    },

    /// The state store could not be written
    #[error("failed to write order {id}: {source}")]
    StoreWrite {
        /// Order id
        id: String,
        /// State store error
        #[source]
        source: StateStoreError,
    },
}

/// Order operations.
#[async_trait]
pub trait OrderManager: Send + Sync {
    /// Validate the order and publish its creation event.
    ///
    /// Returns the order unchanged; it is not readable until ingested.
    async fn create(&self, order: Order) -> Result<Order, OrderError>;

    /// List orders.
    ///
    /// The state store offers no key enumeration, so this is always empty.
    async fn list(&self) -> Result<Vec<Order>, OrderError>;

    /// Fetch an ingested order.
    async fn get(&self, id: &str) -> Result<Order, OrderError>;

    /// Remove an order. Removing an absent order is [`OrderError::NotFound`].
    async fn delete(&self, id: &str) -> Result<(), OrderError>;

    /// Persist an order delivered on the topic.
    async fn on_new_order(&self, order: Order) -> Result<(), OrderError>;
}

/// Component names the manager addresses on the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarComponents {
    /// Pub/sub component
    pub pubsub_name: String,
    /// Topic for creation events
    pub topic: String,
    /// State store component
    pub store_name: String,
}

impl From<&Config> for SidecarComponents {
    fn from(config: &Config) -> Self {
        Self {
            pubsub_name: config.pubsub.name.clone(),
            topic: config.pubsub.topic.clone(),
            store_name: config.statestore.name.clone(),
        }
    }
}

/// [`OrderManager`] backed by the sidecar's pub/sub and state store.
pub struct SidecarOrderManager {
    pubsub: Arc<dyn PubSub>,
    store: Arc<dyn StateStore>,
    components: SidecarComponents,
}

impl SidecarOrderManager {
    /// Create a manager over the given ports.
    #[must_use]
    pub fn new(
        pubsub: Arc<dyn PubSub>,
        store: Arc<dyn StateStore>,
        components: SidecarComponents,
    ) -> Self {
        Self {
            pubsub,
            store,
            components,
        }
    }

    async fn publish(&self, order: &Order) -> Result<(), OrderError> {
        order.validate()?;

        let data = serde_json::to_vec(order).map_err(|source| OrderError::Serialization {
            id: order.id.clone(),
            source,
        })?;

        self.pubsub
            .publish(PublishRequest::json(
                &self.components.pubsub_name,
                &self.components.topic,
                &data,
            ))
            .await
            .map_err(|source| OrderError::Publish {
                id: order.id.clone(),
                source,
            })
    }

    async fn ingest(&self, order: &Order) -> Result<(), OrderError> {
        order.validate()?;

        let data = serde_json::to_vec(order).map_err(|source| OrderError::Serialization {
            id: order.id.clone(),
            source,
        })?;

        self.store
            .save(&self.components.store_name, &order.id, data)
            .await
            .map_err(|source| OrderError::StoreWrite {
                id: order.id.clone(),
                source,
            })
    }

    async fn fetch(&self, id: &str) -> Result<Order, OrderError> {
        let item = self
            .store
            .get(&self.components.store_name, id)
            .await
            .map_err(|source| OrderError::StoreRead {
                id: id.to_string(),
                source,
            })?
            .filter(|item| !item.value.is_empty())
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;

        serde_json::from_slice(&item.value).map_err(|source| OrderError::Deserialization {
            id: id.to_string(),
            source,
        })
    }

    async fn remove(&self, id: &str) -> Result<(), OrderError> {
        let existed = self
            .store
            .delete(&self.components.store_name, id)
            .await
            .map_err(|source| OrderError::StoreWrite {
                id: id.to_string(),
                source,
            })?;

        if existed {
            Ok(())
        } else {
            Err(OrderError::NotFound(id.to_string()))
        }
    }
}

#[async_trait]
impl OrderManager for SidecarOrderManager {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create(&self, order: Order) -> Result<Order, OrderError> {
        match self.publish(&order).await {
            Ok(()) => {
                OrderMetrics::record_created();
                tracing::info!(topic = %self.components.topic, "Order published");
                Ok(order)
            }
            Err(e) => {
                OrderMetrics::record_error("create");
                tracing::warn!(error = %e, "Order create failed");
                Err(e)
            }
        }
    }

    async fn list(&self) -> Result<Vec<Order>, OrderError> {
        tracing::debug!("Listing orders (state store has no key enumeration)");
        Ok(Vec::new())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Order, OrderError> {
        let result = self.fetch(id).await;
        match &result {
            Ok(_) => tracing::debug!("Order loaded"),
            Err(OrderError::NotFound(_)) => tracing::debug!("Order not found"),
            Err(e) => {
                OrderMetrics::record_error("get");
                tracing::warn!(error = %e, "Order get failed");
            }
        }
        result
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), OrderError> {
        let result = self.remove(id).await;
        match &result {
            Ok(()) => {
                OrderMetrics::record_deleted();
                tracing::info!("Order deleted");
            }
            Err(OrderError::NotFound(_)) => tracing::debug!("Order to delete not found"),
            Err(e) => {
                OrderMetrics::record_error("delete");
                tracing::warn!(error = %e, "Order delete failed");
            }
        }
        result
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn on_new_order(&self, order: Order) -> Result<(), OrderError> {
        let result = self.ingest(&order).await;
        match &result {
            Ok(()) => {
                OrderMetrics::record_ingested();
                tracing::info!(store = %self.components.store_name, "Order ingested");
            }
            Err(e) => {
                OrderMetrics::record_error("ingest");
                tracing::warn!(error = %e, "Order ingest failed");
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use order_relay_testing::{InMemoryPubSub, InMemoryStateStore};

    struct Harness {
        bus: InMemoryPubSub,
        store: InMemoryStateStore,
        manager: SidecarOrderManager,
    }

    fn harness() -> Harness {
        let bus = InMemoryPubSub::new();
        let store = InMemoryStateStore::new();
        let manager = SidecarOrderManager::new(
            Arc::new(bus.clone()),
            Arc::new(store.clone()),
            SidecarComponents::from(&Config::default()),
        );
        Harness { bus, store, manager }
    }

    #[tokio::test]
    async fn create_publishes_without_persisting() {
        let h = harness();
        let order = Order::new("o1", "widget");

        let created = h.manager.create(order.clone()).await.unwrap();
        assert_eq!(created, order);

        let published = h.bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].pubsub_name, "pubsub");
        assert_eq!(published[0].topic, "orders");
        assert_eq!(
            serde_json::from_slice::<Order>(&published[0].data).unwrap(),
            order
        );

        assert!(h.store.is_empty("kvstore"));
        assert!(matches!(
            h.manager.get("o1").await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ingested_order_is_readable() {
        let h = harness();
        let order = Order::new("o1", "widget").with_quantity(2);

        h.manager.create(order.clone()).await.unwrap();
        h.manager.on_new_order(order.clone()).await.unwrap();

        assert_eq!(h.manager.get("o1").await.unwrap(), order);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.manager.get("missing").await,
            Err(OrderError::NotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let h = harness();
        h.manager
            .on_new_order(Order::new("o1", "widget"))
            .await
            .unwrap();

        h.manager.delete("o1").await.unwrap();
        assert!(matches!(
            h.manager.get("o1").await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.manager.delete("missing").await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_empty() {
        let h = harness();
        h.manager
            .on_new_order(Order::new("o1", "widget"))
            .await
            .unwrap();
        assert!(h.manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_order_is_rejected_before_publishing() {
        let h = harness();
        let err = h.manager.create(Order::new("", "widget")).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid(ValidationError::EmptyId)));
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn backend_failures_are_classified() {
        let h = harness();

        h.bus.fail_with("broker down");
        assert!(matches!(
            h.manager.create(Order::new("o1", "widget")).await,
            Err(OrderError::Publish { .. })
        ));

        h.store.fail_with("redis down");
        assert!(matches!(
            h.manager.on_new_order(Order::new("o1", "widget")).await,
            Err(OrderError::StoreWrite { .. })
        ));
        assert!(matches!(
            h.manager.get("o1").await,
            Err(OrderError::StoreRead { .. })
        ));
        assert!(matches!(
            h.manager.delete("o1").await,
            Err(OrderError::StoreWrite { .. })
        ));
    }

    #[tokio::test]
    async fn empty_value_is_not_found() {
        let h = harness();
        h.store.insert_raw("kvstore", "o1", Vec::new());

        assert!(matches!(
            h.manager.get("o1").await,
            Err(OrderError::NotFound(id)) if id == "o1"
        ));
        assert!(matches!(
            h.manager.delete("o1").await,
            Err(OrderError::NotFound(id)) if id == "o1"
        ));
    }

    #[tokio::test]
    async fn corrupt_value_is_a_deserialization_error() {
        let h = harness();
        h.store.insert_raw("kvstore", "o1", b"not an order".to_vec());

        assert!(matches!(
            h.manager.get("o1").await,
            Err(OrderError::Deserialization { .. })
        ));
    }
}
