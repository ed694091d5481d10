//! Topic subscriber feeding delivered orders into the manager.

use crate::config::Config;
use crate::manager::OrderManager;
use crate::order::Order;
use order_relay_core::event::TopicEvent;
use order_relay_core::subscription::{HandlerError, Subscription, TopicEventHandler};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Callback route the sidecar delivers new orders to.
pub const NEW_ORDER_ROUTE: &str = "/pubsub/neworder";

/// Handles creation events by calling [`OrderManager::on_new_order`].
///
/// Every failure is reported as non-retryable; redelivery is left to the
/// sidecar's own policy.
pub struct NewOrderHandler {
    manager: Arc<dyn OrderManager>,
    subscription: Subscription,
}

impl NewOrderHandler {
    /// Bind the handler to `subscription`.
    #[must_use]
    pub fn new(manager: Arc<dyn OrderManager>, subscription: Subscription) -> Self {
        Self {
            manager,
            subscription,
        }
    }

    /// Bind the handler to the configured pub/sub and topic on
    /// [`NEW_ORDER_ROUTE`].
    #[must_use]
    pub fn from_config(manager: Arc<dyn OrderManager>, config: &Config) -> Self {
        Self::new(
            manager,
            Subscription::new(&config.pubsub.name, &config.pubsub.topic, NEW_ORDER_ROUTE),
        )
    }
}

impl TopicEventHandler for NewOrderHandler {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle<'a>(
        &'a self,
        event: &'a TopicEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            let invalid = |reason: String| HandlerError::InvalidPayload {
                event_id: event.id.clone(),
                reason,
            };

            let data = event.raw_data().map_err(|e| invalid(e.to_string()))?;
            let order: Order =
                serde_json::from_slice(&data).map_err(|e| invalid(e.to_string()))?;

            self.manager
                .on_new_order(order)
                .await
                .map_err(|e| HandlerError::Processing {
                    event_id: event.id.clone(),
                    reason: e.to_string(),
                    retry: false,
                })
        })
    }
}
