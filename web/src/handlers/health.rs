//! Liveness endpoint.
//!
//! Used by load balancers and orchestrators to verify the process is serving
//! requests. Dependencies (sidecar, stores) are not checked here.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Liveness response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
}

/// Liveness check.
///
/// ```text
/// GET /healthz  ->  200 {"status":"ok"}
/// ```
#[allow(clippy::unused_async)]
pub async fn healthz() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthz() {
        let (status, Json(body)) = healthz().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, HealthResponse { status: "ok" });
    }
}
