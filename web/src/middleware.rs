//! Correlation ID middleware.
//!
//! [`propagate_correlation_id`] runs every request inside an `http_request`
//! span tagged with a correlation ID and echoes that ID back in the
//! `X-Correlation-ID` response header. A valid UUID sent by the caller is
//! reused; anything else is replaced by a fresh one. The ID is also stored in
//! the request extensions, where the [`CorrelationId`] extractor reads it.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/v1/orders", get(list_orders))
//!     .layer(axum::middleware::from_fn(propagate_correlation_id));
//! ```
//!
//! [`CorrelationId`]: crate::extractors::CorrelationId

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Read the caller's correlation ID, or `None` if absent or not a UUID.
pub(crate) fn correlation_id_from(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
}

/// Tag the request with a correlation ID and echo it in the response.
pub async fn propagate_correlation_id(mut req: Request, next: Next) -> Response {
    let correlation_id = correlation_id_from(req.headers()).unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(correlation_id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;

    // A hyphenated UUID is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, body::to_bytes, http, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/orders",
                get(|id: CorrelationId| async move { id.0.to_string() }),
            )
            .layer(from_fn(propagate_correlation_id))
    }

    async fn call(header: Option<&str>) -> (String, String) {
        let mut request = http::Request::builder().uri("/orders");
        if let Some(value) = header {
            request = request.header(CORRELATION_ID_HEADER, value);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let echoed = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generates_id_when_missing() {
        let (echoed, seen_by_handler) = call(None).await;
        assert!(Uuid::parse_str(&echoed).is_ok());
        assert_eq!(echoed, seen_by_handler);
    }

    #[tokio::test]
    async fn reuses_caller_id() {
        let sent = Uuid::new_v4().to_string();
        let (echoed, seen_by_handler) = call(Some(&sent)).await;
        assert_eq!(echoed, sent);
        assert_eq!(seen_by_handler, sent);
    }

    #[tokio::test]
    async fn replaces_invalid_id() {
        let (echoed, _) = call(Some("not-a-uuid")).await;
        assert_ne!(echoed, "not-a-uuid");
        assert!(Uuid::parse_str(&echoed).is_ok());
    }

    #[test]
    fn parses_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert_eq!(correlation_id_from(&headers), None);

        headers.insert(CORRELATION_ID_HEADER, id.to_string().parse().unwrap());
        assert_eq!(correlation_id_from(&headers), Some(id));
    }
}
