//! Application bootstrap and lifecycle.
//!
//! [`Application::build`] wires every component and binds both listeners;
//! [`Application::run`] serves until a shutdown signal or an API listener
//! failure.
//!
//! # Shutdown
//!
//! 1. SIGINT/SIGTERM received
//! 2. API listener stops accepting and drains in-flight requests, bounded by
//!    `http.shutdown_timeout_secs`
//! 3. Callback listener is aborted (the sidecar redelivers unacknowledged
//!    messages)

use crate::config::Config;
use crate::manager::{OrderManager, SidecarComponents, SidecarOrderManager};
use crate::metrics::register_business_metrics;
use crate::router::{AppState, build_router};
use crate::subscriber::NewOrderHandler;
use anyhow::Context;
use axum::Router;
use order_relay_core::health::AlwaysHealthy;
use order_relay_core::pubsub::PubSub;
use order_relay_core::state_store::StateStore;
use order_relay_dapr::{CallbackService, DaprClient, DaprError};
use order_relay_runtime::{
    MetricsRecorder, ShutdownCoordinator, join_with_timeout, wait_for_signal,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Name of the sidecar-facing health check.
pub const HEALTH_CHECK_NAME: &str = "health";

/// Build the callback router the sidecar calls into.
///
/// # Errors
///
/// Returns [`DaprError::InvalidRoute`] if the subscription route is invalid.
pub fn build_callback_router(
    manager: Arc<dyn OrderManager>,
    config: &Config,
) -> Result<Router, DaprError> {
    Ok(CallbackService::new()
        .health_check(Arc::new(AlwaysHealthy::new(HEALTH_CHECK_NAME)))
        .subscribe(Arc::new(NewOrderHandler::from_config(manager, config)))?
        .into_router())
}

/// Build the order manager on top of a connected sidecar client, which
/// serves as both the pub/sub and the state store.
#[must_use]
pub fn sidecar_manager(dapr: Arc<DaprClient>, config: &Config) -> Arc<dyn OrderManager> {
    let pubsub = Arc::clone(&dapr) as Arc<dyn PubSub>;
    let store: Arc<dyn StateStore> = dapr;
    Arc::new(SidecarOrderManager::new(
        pubsub,
        store,
        SidecarComponents::from(config),
    ))
}

/// A fully wired, bound application.
pub struct Application {
    config: Config,
    api_listener: TcpListener,
    api_router: Router,
    callback_listener: TcpListener,
    callback_router: Router,
}

impl Application {
    /// Wire all components and bind both listeners.
    ///
    /// # Errors
    ///
    /// Fails if the metrics recorder cannot be installed, the sidecar is
    /// unreachable, or a listener cannot bind.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let metrics = MetricsRecorder::install().context("failed to install metrics recorder")?;
        register_business_metrics();

        let mut dapr = DaprClient::builder()
            .endpoint(&config.dapr.http_endpoint)
            .timeout(config.dapr.timeout());
        if let Some(token) = &config.dapr.api_token {
            dapr = dapr.api_token(token);
        }
        let dapr = dapr
            .connect()
            .await
            .context("failed to connect to the Dapr sidecar")?;

        let manager = sidecar_manager(Arc::new(dapr), &config);

        let api_router = build_router(AppState::new(Arc::clone(&manager), metrics));
        let callback_router = build_callback_router(manager, &config)?;

        let api_listener = bind(config.http.port)
            .await
            .context("failed to bind API listener")?;
        let callback_listener = bind(config.dapr.port)
            .await
            .context("failed to bind callback listener")?;

        Ok(Self {
            config,
            api_listener,
            api_router,
            callback_listener,
            callback_router,
        })
    }

    /// Serve until SIGINT/SIGTERM or an API listener failure.
    ///
    /// # Errors
    ///
    /// Returns the API listener's error if it stops on its own.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            config,
            api_listener,
            api_router,
            callback_listener,
            callback_router,
        } = self;

        let shutdown_timeout = config.http.shutdown_timeout();
        let coordinator = ShutdownCoordinator::new();

        info!(addr = ?api_listener.local_addr().ok(), "Order API listening");
        info!(
            addr = ?callback_listener.local_addr().ok(),
            pubsub = %config.pubsub.name,
            topic = %config.pubsub.topic,
            "Sidecar callback service listening"
        );

        let api_shutdown = coordinator.subscribe();
        let mut api = tokio::spawn(async move {
            axum::serve(api_listener, api_router)
                .with_graceful_shutdown(api_shutdown.wait())
                .await
        });
        let api_abort = api.abort_handle();

        let callback = tokio::spawn(async move {
            if let Err(e) = axum::serve(callback_listener, callback_router).await {
                warn!(error = %e, "Sidecar callback listener stopped");
            }
        });

        tokio::select! {
            () = wait_for_signal() => {}
            result = &mut api => {
                callback.abort();
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e).context("API listener failed"),
                    Err(e) => Err(e).context("API listener task failed"),
                };
            }
        }

        coordinator.trigger();
        if !join_with_timeout("api", api, shutdown_timeout).await {
            api_abort.abort();
        }
        callback.abort();

        info!("Graceful shutdown complete");
        Ok(())
    }
}

async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn sidecar_client_wires_both_routers() {
        let config = Config::default();
        let dapr = DaprClient::builder()
            .endpoint(&config.dapr.http_endpoint)
            .build()
            .unwrap();

        let manager = sidecar_manager(Arc::new(dapr), &config);
        assert!(manager.list().await.unwrap().is_empty());

        let callback = build_callback_router(Arc::clone(&manager), &config).unwrap();
        let response = callback
            .oneshot(
                Request::builder()
                    .uri("/dapr/subscribe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let subscriptions: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(subscriptions[0]["route"], crate::NEW_ORDER_ROUTE);

        let api = build_router(AppState::new(manager, MetricsRecorder::detached()));
        let response = api
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
