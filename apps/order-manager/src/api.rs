//! HTTP handlers for `/v1/orders`.
//!
//! | method | path              | success        | failures          |
//! |--------|-------------------|----------------|-------------------|
//! | GET    | `/v1/orders`      | 200 `[]`       | 500               |
//! | GET    | `/v1/orders/:id`  | 200 order      | 404, 500          |
//! | POST   | `/v1/orders`      | 201 order      | 400, 500          |
//! | DELETE | `/v1/orders/:id`  | 200 empty      | 404, 500          |

use crate::manager::OrderError;
use crate::order::Order;
use crate::router::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use order_relay_web::{AppError, CorrelationId, JsonBody, WebResult};

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => Self::not_found(err.to_string()),
            OrderError::Invalid(_) => Self::bad_request(err.to_string()),
            other => Self::internal("internal server error").with_source(other.into()),
        }
    }
}

/// List orders.
///
/// ```text
/// GET /v1/orders
/// ```
pub async fn list_orders(State(state): State<AppState>) -> WebResult<Json<Vec<Order>>> {
    Ok(Json(state.manager.list().await?))
}

/// Get an ingested order.
///
/// ```text
/// GET /v1/orders/:id
/// ```
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<Order>> {
    Ok(Json(state.manager.get(&id).await?))
}

/// Accept an order and publish its creation event.
///
/// The order is not readable until the event has been delivered back and
/// ingested.
///
/// ```text
/// POST /v1/orders
/// {"id": "o1", "item": "widget"}
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    JsonBody(order): JsonBody<Order>,
) -> WebResult<(StatusCode, Json<Order>)> {
    tracing::debug!(
        correlation_id = %correlation_id.0,
        order_id = %order.id,
        "Create order request"
    );
    let created = state.manager.create(order).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete an order.
///
/// ```text
/// DELETE /v1/orders/:id
/// ```
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<StatusCode> {
    state.manager.delete(&id).await?;
    Ok(StatusCode::OK)
}
