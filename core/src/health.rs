//! Named health checks reported to the sidecar.

use std::future::Future;
use std::pin::Pin;

/// A health check the sidecar polls through the callback service.
pub trait HealthCheck: Send + Sync {
    /// Check name (e.g., `"health"`).
    fn name(&self) -> &str;

    /// Run the check.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the application is unhealthy.
    fn check(&self) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;
}

/// A check that always passes once the process is serving requests.
#[derive(Debug, Clone)]
pub struct AlwaysHealthy {
    name: String,
}

impl AlwaysHealthy {
    /// Create a liveness check with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl HealthCheck for AlwaysHealthy {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
