//! Router configuration for the public API.

use crate::api;
use crate::manager::OrderManager;
use axum::{Router, extract::FromRef, middleware::from_fn, routing::get};
use order_relay_runtime::MetricsRecorder;
use order_relay_web::{panic_response, propagate_correlation_id};
use order_relay_web::handlers::{healthz, render_metrics};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Shared state of the public API.
#[derive(Clone)]
pub struct AppState {
    /// Order operations
    pub manager: Arc<dyn OrderManager>,
    /// Prometheus handle rendered by `/metrics`
    pub metrics: MetricsRecorder,
}

impl AppState {
    /// Create the state.
    #[must_use]
    pub fn new(manager: Arc<dyn OrderManager>, metrics: MetricsRecorder) -> Self {
        Self { manager, metrics }
    }
}

impl FromRef<AppState> for MetricsRecorder {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Build the public API router.
///
/// - `GET /healthz`, `GET /metrics`
/// - `/v1/orders` (see [`api`])
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/orders", get(api::list_orders).post(api::create_order))
        .route(
            "/orders/:id",
            get(api::get_order).delete(api::delete_order),
        );

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(render_metrics))
        .nest("/v1", v1)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(propagate_correlation_id))
        .with_state(state)
}
