//! Callback router behaviour as seen by the sidecar.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use order_relay_core::event::TopicEvent;
use order_relay_core::health::{AlwaysHealthy, HealthCheck};
use order_relay_core::pubsub::CONTENT_TYPE_JSON;
use order_relay_core::subscription::{HandlerError, Subscription, TopicEventHandler};
use order_relay_dapr::{CallbackService, DaprError};
use order_relay_testing::PublishedMessage;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records payloads and answers with a fixed outcome.
struct RecordingHandler {
    subscription: Subscription,
    outcome: Option<bool>,
    received: Mutex<Vec<Vec<u8>>>,
}

impl RecordingHandler {
    /// `outcome`: `None` succeeds, `Some(retry)` fails with that retry flag.
    fn new(route: &str, outcome: Option<bool>) -> Arc<Self> {
        Arc::new(Self {
            subscription: Subscription::new("pubsub", "orders", route),
            outcome,
            received: Mutex::new(Vec::new()),
        })
    }
}

impl TopicEventHandler for RecordingHandler {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn handle<'a>(
        &'a self,
        event: &'a TopicEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            self.received.lock().unwrap().push(event.raw_data().unwrap());
            match self.outcome {
                None => Ok(()),
                Some(retry) => Err(HandlerError::Processing {
                    event_id: event.id.clone(),
                    reason: "boom".to_string(),
                    retry,
                }),
            }
        })
    }
}

struct FailingCheck;

impl HealthCheck for FailingCheck {
    fn name(&self) -> &str {
        "health"
    }

    fn check(&self) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async { Err("state store unreachable".to_string()) })
    }
}

fn delivery(payload: &[u8]) -> Vec<u8> {
    PublishedMessage {
        pubsub_name: "pubsub".to_string(),
        topic: "orders".to_string(),
        data: payload.to_vec(),
        content_type: CONTENT_TYPE_JSON.to_string(),
    }
    .to_delivery_body()
}

async fn post_json(router: axum::Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/cloudevents+json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_registered_subscriptions() {
    let router = CallbackService::new()
        .subscribe(RecordingHandler::new("/pubsub/neworder", None))
        .unwrap()
        .into_router();

    let (status, body) = get_json(router, "/dapr/subscribe").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"pubsubname": "pubsub", "topic": "orders", "route": "/pubsub/neworder"}])
    );
}

#[tokio::test]
async fn successful_delivery_reports_success() {
    let handler = RecordingHandler::new("/pubsub/neworder", None);
    let router = CallbackService::new()
        .subscribe(handler.clone())
        .unwrap()
        .into_router();

    let payload = br#"{"id":"o1","item":"widget"}"#;
    let (status, body) = post_json(router, "/pubsub/neworder", delivery(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "SUCCESS"}));
    assert_eq!(handler.received.lock().unwrap().as_slice(), &[payload.to_vec()]);
}

#[tokio::test]
async fn handler_failure_maps_retry_flag() {
    let router = CallbackService::new()
        .subscribe(RecordingHandler::new("/drop", Some(false)))
        .unwrap()
        .subscribe(RecordingHandler::new("/retry", Some(true)))
        .unwrap()
        .into_router();

    let (_, dropped) = post_json(router.clone(), "/drop", delivery(b"{}")).await;
    assert_eq!(dropped, json!({"status": "DROP"}));

    let (_, retried) = post_json(router, "/retry", delivery(b"{}")).await;
    assert_eq!(retried, json!({"status": "RETRY"}));
}

#[tokio::test]
async fn undecodable_envelope_is_dropped() {
    let handler = RecordingHandler::new("/pubsub/neworder", None);
    let router = CallbackService::new()
        .subscribe(handler.clone())
        .unwrap()
        .into_router();

    let (status, body) = post_json(router, "/pubsub/neworder", b"not json".to_vec()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "DROP"}));
    assert!(handler.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_reflects_registered_checks() {
    let healthy = CallbackService::new()
        .health_check(Arc::new(AlwaysHealthy::new("health")))
        .into_router();
    let (status, _) = get_json(healthy, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let unhealthy = CallbackService::new()
        .health_check(Arc::new(FailingCheck))
        .into_router();
    let (status, body) = get_json(unhealthy, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["check"], "health");
}

#[test]
fn rejects_invalid_routes() {
    let duplicate = CallbackService::new()
        .subscribe(RecordingHandler::new("/pubsub/neworder", None))
        .unwrap()
        .subscribe(RecordingHandler::new("/pubsub/neworder", None));
    assert!(matches!(duplicate, Err(DaprError::InvalidRoute { .. })));

    let relative = CallbackService::new().subscribe(RecordingHandler::new("neworder", None));
    assert!(matches!(relative, Err(DaprError::InvalidRoute { .. })));

    let reserved = CallbackService::new().subscribe(RecordingHandler::new("/health", None));
    assert!(matches!(reserved, Err(DaprError::InvalidRoute { .. })));
}
