//! End-to-end tests over the public API and the sidecar callback service.
//!
//! The sidecar is played by the in-memory doubles: published messages are
//! drained from `InMemoryPubSub` and POSTed to the callback router as the
//! sidecar would deliver them.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use order_manager::{
    AppState, Config, NEW_ORDER_ROUTE, Order, OrderError, OrderManager, SidecarComponents,
    SidecarOrderManager, build_callback_router, build_router,
};
use order_relay_runtime::MetricsRecorder;
use order_relay_testing::{InMemoryPubSub, InMemoryStateStore, init_test_tracing};
use order_relay_web::CORRELATION_ID_HEADER;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    api: Router,
    callback: Router,
    bus: InMemoryPubSub,
    store: InMemoryStateStore,
}

impl TestApp {
    fn new() -> Self {
        init_test_tracing();

        let config = Config::default();
        let bus = InMemoryPubSub::new();
        let store = InMemoryStateStore::new();
        let manager: Arc<dyn OrderManager> = Arc::new(SidecarOrderManager::new(
            Arc::new(bus.clone()),
            Arc::new(store.clone()),
            SidecarComponents::from(&config),
        ));

        Self {
            api: build_router(AppState::new(
                Arc::clone(&manager),
                MetricsRecorder::detached(),
            )),
            callback: build_callback_router(manager, &config).unwrap(),
            bus,
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.api.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post(&self, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Deliver every pending message the way the sidecar would; returns the
    /// delivery statuses.
    async fn deliver_pending(&self) -> Vec<Value> {
        let mut statuses = Vec::new();
        for message in self.bus.take_published() {
            let response = self
                .callback
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(NEW_ORDER_ROUTE)
                        .header("content-type", "application/cloudevents+json")
                        .body(Body::from(message.to_delivery_body()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            statuses.push(serde_json::from_slice(&body).unwrap());
        }
        statuses
    }
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn order_lifecycle_end_to_end() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/v1/orders", r#"{"id":"o1","item":"widget"}"#)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(&body), json!({"id": "o1", "item": "widget"}));

    // Published but not yet delivered: not readable
    let (status, _) = app.get("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.deliver_pending().await, vec![json!({"status": "SUCCESS"})]);

    let (status, body) = app.get("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"id": "o1", "item": "widget"}));

    let (status, body) = app.delete("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, body) = app.get("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json_body(&body)["message"].is_string());
}

#[tokio::test]
async fn list_is_always_empty() {
    let app = TestApp::new();
    app.post("/v1/orders", r#"{"id":"o1","item":"widget"}"#).await;
    app.deliver_pending().await;

    let (status, body) = app.get("/v1/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn delete_unknown_order_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.delete("/v1/orders/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"message": "order missing not found"}));
}

#[tokio::test]
async fn bad_create_requests_are_rejected() {
    let app = TestApp::new();

    for body in [
        r#"{"id":"o1","item":"#,
        r#"{"id":"o1","item":"widget","colour":"red"}"#,
        r#"{"id":"","item":"widget"}"#,
        r#"{"id":"a/b","item":"widget"}"#,
        r#"{"id":"o1","item":"widget","quantity":0}"#,
        r#"{"id":"o1"}"#,
    ] {
        let (status, response) = app.post("/v1/orders", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert!(json_body(&response)["message"].is_string());
    }

    assert!(app.bus.published().is_empty());
}

#[tokio::test]
async fn publish_failure_is_internal_error_without_detail() {
    let app = TestApp::new();
    app.bus.fail_with("broker unreachable at 10.0.0.7");

    let (status, body) = app
        .post("/v1/orders", r#"{"id":"o1","item":"widget"}"#)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body), json!({"message": "internal server error"}));
}

#[tokio::test]
async fn store_failure_drops_delivery_and_fails_reads() {
    let app = TestApp::new();
    app.post("/v1/orders", r#"{"id":"o1","item":"widget"}"#).await;

    app.store.fail_with("redis down");
    assert_eq!(app.deliver_pending().await, vec![json!({"status": "DROP"})]);

    let (status, _) = app.get("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.store.recover();
    let (status, _) = app.get("/v1/orders/o1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_service_advertises_subscription_and_health() {
    let app = TestApp::new();

    let response = app
        .callback
        .clone()
        .oneshot(Request::builder().uri("/dapr/subscribe").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        json_body(&body),
        json!([{"pubsubname": "pubsub", "topic": "orders", "route": "/pubsub/neworder"}])
    );

    let response = app
        .callback
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"status": "ok"}));

    let (status, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_correlation_id() {
    let app = TestApp::new();
    let response = app
        .api
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
}

/// Manager whose every operation panics.
struct PanickingManager;

#[async_trait]
#[allow(clippy::panic)] // Exercises the panic boundary
impl OrderManager for PanickingManager {
    async fn create(&self, _order: Order) -> Result<Order, OrderError> {
        panic!("create exploded")
    }

    async fn list(&self) -> Result<Vec<Order>, OrderError> {
        panic!("list exploded")
    }

    async fn get(&self, id: &str) -> Result<Order, OrderError> {
        panic!("get {id} exploded")
    }

    async fn delete(&self, id: &str) -> Result<(), OrderError> {
        panic!("delete {id} exploded")
    }

    async fn on_new_order(&self, _order: Order) -> Result<(), OrderError> {
        panic!("on_new_order exploded")
    }
}

#[tokio::test]
async fn handler_panic_is_internal_error_envelope() {
    init_test_tracing();
    let api = build_router(AppState::new(Arc::new(PanickingManager), MetricsRecorder::detached()));

    let response = api
        .oneshot(Request::builder().uri("/v1/orders/o1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(json_body(&body), json!({"message": "internal server error"}));
}
