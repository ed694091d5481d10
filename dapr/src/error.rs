//! Error types for the Dapr adapters.

use thiserror::Error;

/// Errors raised while constructing or connecting the Dapr adapters.
///
/// Per-operation failures are reported through the port error types
/// ([`PubSubError`](order_relay_core::PubSubError),
/// [`StateStoreError`](order_relay_core::StateStoreError)) instead.
#[derive(Error, Debug)]
pub enum DaprError {
    /// Endpoint is not an absolute `http(s)` URL
    #[error("Invalid Dapr endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// API token cannot be sent as a header value
    #[error("Invalid Dapr API token: {0}")]
    InvalidApiToken(String),

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The sidecar could not be reached
    #[error("Dapr sidecar at {endpoint} is unreachable: {reason}")]
    Unreachable {
        /// Sidecar endpoint
        endpoint: String,
        /// Transport error
        reason: String,
    },

    /// The sidecar answered the health probe with a failure status
    #[error("Dapr sidecar at {endpoint} is unhealthy (status {status})")]
    Unhealthy {
        /// Sidecar endpoint
        endpoint: String,
        /// HTTP status returned by the probe
        status: u16,
    },

    /// A callback route is malformed or registered twice
    #[error("Invalid callback route '{route}': {reason}")]
    InvalidRoute {
        /// The rejected route
        route: String,
        /// Why it was rejected
        reason: String,
    },
}
