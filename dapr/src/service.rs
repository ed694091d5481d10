//! App callback service the Dapr sidecar calls into.
//!
//! The sidecar discovers subscriptions through `GET /dapr/subscribe`, pushes
//! each delivery as a CloudEvent to the subscription's route and expects a
//! `{"status": "SUCCESS" | "RETRY" | "DROP"}` answer. It also polls
//! `GET /health` when app health checks are enabled.
//!
//! # Example
//!
//! ```ignore
//! let router = CallbackService::new()
//!     .health_check(Arc::new(AlwaysHealthy::new("health")))
//!     .subscribe(Arc::new(NewOrderHandler::new(manager, subscription)))?
//!     .into_router();
//!
//! axum::serve(listener, router).await?;
//! ```

use crate::error::DaprError;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use order_relay_core::event::TopicEvent;
use order_relay_core::health::HealthCheck;
use order_relay_core::subscription::{DeliveryStatus, Subscription, TopicEventHandler};
use order_relay_runtime::metrics::DeliveryMetrics;
use serde::Serialize;
use std::sync::Arc;

/// Route the sidecar reads subscriptions from.
pub const SUBSCRIBE_ROUTE: &str = "/dapr/subscribe";

/// Route the sidecar probes for app health.
pub const HEALTH_ROUTE: &str = "/health";

/// Builder for the callback router.
#[derive(Default)]
pub struct CallbackService {
    handlers: Vec<Arc<dyn TopicEventHandler>>,
    health_checks: Vec<Arc<dyn HealthCheck>>,
}

impl CallbackService {
    /// Create a service with no subscriptions and no health checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic handler.
    ///
    /// # Errors
    ///
    /// Returns [`DaprError::InvalidRoute`] if the route does not start with
    /// `/`, collides with a built-in route, or is already registered.
    pub fn subscribe(mut self, handler: Arc<dyn TopicEventHandler>) -> Result<Self, DaprError> {
        let route = handler.subscription().route.clone();
        let invalid = |reason: &str| DaprError::InvalidRoute {
            route: route.clone(),
            reason: reason.to_string(),
        };

        if !route.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if route == SUBSCRIBE_ROUTE || route == HEALTH_ROUTE {
            return Err(invalid("reserved by the callback service"));
        }
        if self
            .handlers
            .iter()
            .any(|existing| existing.subscription().route == route)
        {
            return Err(invalid("already registered"));
        }

        tracing::info!(
            pubsub = %handler.subscription().pubsub_name,
            topic = %handler.subscription().topic,
            route = %route,
            "Registered topic subscription"
        );
        self.handlers.push(handler);
        Ok(self)
    }

    /// Register a health check evaluated on `GET /health`.
    #[must_use]
    pub fn health_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.health_checks.push(check);
        self
    }

    /// Subscriptions currently registered.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.handlers
            .iter()
            .map(|handler| handler.subscription().clone())
            .collect()
    }

    /// Build the axum router.
    #[must_use]
    pub fn into_router(self) -> Router {
        let subscriptions = self.subscriptions();
        let checks = Arc::new(self.health_checks);

        let mut router = Router::new()
            .route(
                SUBSCRIBE_ROUTE,
                get(move || {
                    let subscriptions = subscriptions.clone();
                    async move { Json(subscriptions) }
                }),
            )
            .route(
                HEALTH_ROUTE,
                get(move || {
                    let checks = Arc::clone(&checks);
                    async move { run_health_checks(&checks).await }
                }),
            );

        for handler in self.handlers {
            let route = handler.subscription().route.clone();
            router = router.route(
                &route,
                post(move |body: Bytes| {
                    let handler = Arc::clone(&handler);
                    async move { deliver(handler.as_ref(), &body).await }
                }),
            );
        }

        router
    }
}

#[derive(Serialize)]
struct DeliveryResponse {
    status: DeliveryStatus,
}

async fn deliver(handler: &dyn TopicEventHandler, body: &[u8]) -> Json<DeliveryResponse> {
    let topic = &handler.subscription().topic;

    let status = match TopicEvent::from_slice(body) {
        Ok(event) => {
            let result = handler.handle(&event).await;
            let status = DeliveryStatus::from_result(&result);
            match &result {
                Ok(()) => tracing::debug!(event = %event, "Delivery handled"),
                Err(e) => tracing::warn!(
                    event = %event,
                    error = %e,
                    status = status.as_str(),
                    "Delivery handler failed"
                ),
            }
            status
        }
        Err(e) => {
            tracing::warn!(topic = %topic, error = %e, "Dropping undecodable delivery");
            DeliveryStatus::Drop
        }
    };

    DeliveryMetrics::record_delivery(topic, status.as_str());
    Json(DeliveryResponse { status })
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn run_health_checks(checks: &[Arc<dyn HealthCheck>]) -> Response {
    for check in checks {
        if let Err(error) = check.check().await {
            tracing::warn!(check = check.name(), error = %error, "Health check failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    check: Some(check.name()),
                    error: Some(error),
                }),
            )
                .into_response();
        }
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            check: None,
            error: None,
        }),
    )
        .into_response()
}
