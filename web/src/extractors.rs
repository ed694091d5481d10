//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID
//! - `JsonBody`: JSON request body whose failures render as 400 `AppError`s
//!
//! # Examples
//!
//! ```ignore
//! use order_relay_web::extractors::{CorrelationId, JsonBody};
//!
//! async fn create(
//!     correlation_id: CorrelationId,
//!     JsonBody(order): JsonBody<Order>,
//! ) -> Result<Json<Order>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Creating order");
//!     Ok(Json(order))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::correlation_id_from;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then a valid UUID in
/// the `X-Correlation-ID` header, and finally generates a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        Ok(Self(
            correlation_id_from(&parts.headers).unwrap_or_else(Uuid::new_v4),
        ))
    }
}

/// JSON request body.
///
/// Unlike `axum::Json`, the `Content-Type` header is not required, and every
/// failure (unreadable body, malformed JSON, schema mismatch) is rejected as
/// `400 Bad Request` with the `{"message"}` envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(format!("invalid request body: {e}")))?;

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::bad_request(format!("invalid request body: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::middleware::CORRELATION_ID_HEADER;
    use axum::body::Body;
    use axum::http::{self, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        id: String,
    }

    fn json_request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .body(Body::from(body))
            .expect("Valid request")
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = http::Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = http::Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(stored);

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let req = http::Request::builder().body(()).expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_json_body_without_content_type() {
        let JsonBody(payload) =
            JsonBody::<Payload>::from_request(json_request(r#"{"id":"o1"}"#), &())
                .await
                .unwrap();
        assert_eq!(payload, Payload { id: "o1".to_string() });
    }

    #[tokio::test]
    async fn test_json_body_rejections_are_bad_request() {
        for body in [r#"{"id":"#, r#"{"id":"o1","extra":1}"#, "[]", ""] {
            let err = JsonBody::<Payload>::from_request(json_request(body), &())
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }
}
