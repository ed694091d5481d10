//! # Order Relay Testing
//!
//! Testing utilities for Order Relay.
//!
//! This crate provides:
//! - In-memory implementations of the sidecar ports ([`mocks`])
//! - Failure injection for error-path tests
//! - Helpers that turn published messages into deliveries, so tests can drive
//!   the subscriber exactly like the sidecar would
//!
//! ## Example
//!
//! ```
//! use order_relay_core::pubsub::{PubSub, PublishRequest};
//! use order_relay_testing::mocks::InMemoryPubSub;
//!
//! # tokio_test::block_on(async {
//! let bus = InMemoryPubSub::new();
//! bus.publish(PublishRequest::json("pubsub", "orders", br#"{"id":"o1"}"#))
//!     .await
//!     .unwrap();
//!
//! let published = bus.take_published();
//! assert_eq!(published.len(), 1);
//! assert_eq!(published[0].topic, "orders");
//! # });
//! ```

pub mod mocks;

pub use mocks::{InMemoryPubSub, InMemoryStateStore, PublishedMessage};

/// Install a compact `tracing` subscriber for tests.
///
/// Safe to call from every test; only the first call installs it. Honors
/// `RUST_LOG` and defaults to `debug` for this workspace's crates.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,order_relay=debug,order_manager=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
