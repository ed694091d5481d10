//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] fans a single shutdown trigger out to every
//! server and background task of the process. Each component holds a
//! [`ShutdownListener`] and passes [`ShutdownListener::wait`] to
//! `axum::serve(..).with_graceful_shutdown(..)` or selects on it.
//!
//! ## Usage
//!
//! ```ignore
//! use order_relay_runtime::shutdown::{wait_for_signal, ShutdownCoordinator};
//!
//! let coordinator = ShutdownCoordinator::new();
//! let listener = coordinator.subscribe();
//!
//! let server = tokio::spawn(async move {
//!     axum::serve(listener_socket, router)
//!         .with_graceful_shutdown(listener.wait())
//!         .await
//! });
//!
//! wait_for_signal().await;
//! coordinator.trigger();
//! ```

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Broadcasts a one-shot shutdown trigger to any number of listeners.
///
/// Listeners created after [`trigger`](Self::trigger) observe the shutdown
/// immediately.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    /// Create a coordinator in the running state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a listener for the shutdown trigger.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Start shutdown. Idempotent.
    pub fn trigger(&self) {
        let changed = self.tx.send_if_modified(|stopping| {
            let was_running = !*stopping;
            *stopping = true;
            was_running
        });
        if changed {
            info!(
                listeners = self.tx.receiver_count(),
                "Shutdown triggered"
            );
        }
    }

    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of a [`ShutdownCoordinator`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been triggered.
    ///
    /// Also resolves if the coordinator is dropped, since nothing can keep
    /// the process running past that point.
    pub async fn wait(mut self) {
        // An Err means the sender is gone; treat it as shutdown.
        let _ = self.rx.wait_for(|stopping| *stopping).await;
    }
}

/// Wait for Ctrl+C or SIGTERM.
///
/// If a signal handler cannot be installed, the failure is logged and that
/// signal source is ignored instead of aborting the process.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

/// Wait for a spawned component to finish, giving up after `timeout`.
///
/// Returns `true` if the task completed (successfully or not) in time.
pub async fn join_with_timeout<T>(name: &str, handle: JoinHandle<T>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(_)) => {
            info!(component = name, "Component stopped gracefully");
            true
        }
        Ok(Err(e)) => {
            warn!(component = name, error = %e, "Component task failed");
            true
        }
        Err(_) => {
            warn!(component = name, timeout = ?timeout, "Component shutdown timed out");
            false
        }
    }
}
