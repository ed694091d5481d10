//! HTTP client for the Dapr building-block API.
//!
//! [`DaprClient`] implements both [`PubSub`] and [`StateStore`] on top of the
//! sidecar's HTTP interface:
//!
//! | operation | request                                            |
//! |-----------|----------------------------------------------------|
//! | publish   | `POST /v1.0/publish/{pubsub}/{topic}`              |
//! | get       | `GET /v1.0/state/{store}/{key}`                    |
//! | save      | `POST /v1.0/state/{store}`                         |
//! | delete    | `DELETE /v1.0/state/{store}/{key}`                 |
//! | probe     | `GET /v1.0/healthz/outbound`                       |
//!
//! # Example
//!
//! ```no_run
//! use order_relay_dapr::DaprClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DaprClient::builder()
//!     .endpoint("http://localhost:3500")
//!     .timeout(Duration::from_secs(5))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::DaprError;
use order_relay_core::pubsub::{PubSub, PubSubError, PublishRequest};
use order_relay_core::state_store::{StateItem, StateStore, StateStoreError};
use order_relay_runtime::metrics::{PubSubMetrics, StateStoreMetrics};
use reqwest::header::{CONTENT_TYPE, ETAG, HeaderMap, HeaderValue, IF_MATCH};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// Header carrying the sidecar API token.
pub const API_TOKEN_HEADER: &str = "dapr-api-token";

/// Default sidecar HTTP endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3500";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const API_VERSION: &str = "v1.0";

/// Dapr sidecar client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct DaprClient {
    http: Client,
    endpoint: Url,
}

impl DaprClient {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> DaprClientBuilder {
        DaprClientBuilder::default()
    }

    /// The sidecar endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Probe the sidecar's outbound health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DaprError::Unreachable`] on transport failure and
    /// [`DaprError::Unhealthy`] on a non-success status.
    pub async fn check_health(&self) -> Result<(), DaprError> {
        let url = self
            .url(&["healthz", "outbound"])
            .map_err(|reason| DaprError::InvalidEndpoint {
                endpoint: self.endpoint.to_string(),
                reason,
            })?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DaprError::Unreachable {
                endpoint: self.endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(endpoint = %self.endpoint, "Dapr sidecar is healthy");
            Ok(())
        } else {
            Err(DaprError::Unhealthy {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// Build `{endpoint}/v1.0/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| "endpoint cannot be used as a base URL".to_string())?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    async fn fetch(
        &self,
        store_name: &str,
        key: &str,
    ) -> Result<Option<StateItem>, StateStoreError> {
        let url = self
            .url(&["state", store_name, key])
            .map_err(|reason| operation_failed(store_name, key, reason))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| state_transport_error(store_name, key, &e))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| state_transport_error(store_name, key, &e))?;

                if body.is_empty() {
                    return Ok(None);
                }

                let item = StateItem::new(key, body.to_vec());
                Ok(Some(match etag {
                    Some(etag) => item.with_etag(etag),
                    None => item,
                }))
            }
            status => Err(operation_failed(
                store_name,
                key,
                error_reason(status, response).await,
            )),
        }
    }

    async fn store(
        &self,
        store_name: &str,
        key: &str,
        value: &[u8],
    ) -> Result<(), StateStoreError> {
        let url = self
            .url(&["state", store_name])
            .map_err(|reason| operation_failed(store_name, key, reason))?;

        let body = [SaveStateItem {
            key,
            value: state_value(value),
        }];

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| state_transport_error(store_name, key, &e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(operation_failed(
                store_name,
                key,
                error_reason(status, response).await,
            ))
        }
    }

    async fn remove(&self, store_name: &str, key: &str) -> Result<bool, StateStoreError> {
        let Some(existing) = self.fetch(store_name, key).await? else {
            return Ok(false);
        };

        let url = self
            .url(&["state", store_name, key])
            .map_err(|reason| operation_failed(store_name, key, reason))?;

        let mut request = self.http.delete(url);
        if let Some(etag) = &existing.etag {
            request = request.header(IF_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| state_transport_error(store_name, key, &e))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            Err(operation_failed(
                store_name,
                key,
                error_reason(status, response).await,
            ))
        }
    }
}

/// Builder for [`DaprClient`].
#[derive(Default)]
pub struct DaprClientBuilder {
    endpoint: Option<String>,
    api_token: Option<String>,
    timeout: Option<Duration>,
}

impl DaprClientBuilder {
    /// Set the sidecar HTTP endpoint.
    ///
    /// Default: `http://localhost:3500`
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Send `dapr-api-token` with every request.
    #[must_use]
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client without contacting the sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`DaprError::InvalidEndpoint`] for a malformed or non-http(s)
    /// endpoint, [`DaprError::InvalidApiToken`] if the token is not a valid
    /// header value, or [`DaprError::ClientBuild`] if the HTTP client cannot
    /// be created.
    pub fn build(self) -> Result<DaprClient, DaprError> {
        let raw_endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&raw_endpoint).map_err(|e| DaprError::InvalidEndpoint {
            endpoint: raw_endpoint.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(DaprError::InvalidEndpoint {
                endpoint: raw_endpoint,
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &self.api_token {
            let mut value = HeaderValue::from_str(token)
                .map_err(|e| DaprError::InvalidApiToken(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_TOKEN_HEADER, value);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DaprError::ClientBuild(e.to_string()))?;

        tracing::info!(
            endpoint = %endpoint,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            api_token = self.api_token.is_some(),
            "DaprClient created"
        );

        Ok(DaprClient { http, endpoint })
    }

    /// Build the client and verify the sidecar is reachable.
    ///
    /// # Errors
    ///
    /// Any [`build`](Self::build) error, or the probe failure from
    /// [`DaprClient::check_health`].
    pub async fn connect(self) -> Result<DaprClient, DaprError> {
        let client = self.build()?;
        client.check_health().await?;
        tracing::info!(endpoint = %client.endpoint, "Connected to Dapr sidecar");
        Ok(client)
    }
}

impl PubSub for DaprClient {
    fn publish<'a>(
        &'a self,
        request: PublishRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PubSubError>> + Send + 'a>> {
        Box::pin(async move {
            let start = Instant::now();
            let publish_failed = |reason: String| PubSubError::PublishFailed {
                pubsub_name: request.pubsub_name.to_string(),
                topic: request.topic.to_string(),
                reason,
            };

            let result = async {
                let url = self
                    .url(&["publish", request.pubsub_name, request.topic])
                    .map_err(publish_failed)?;

                let response = self
                    .http
                    .post(url)
                    .header(CONTENT_TYPE, request.content_type)
                    .body(request.data.to_vec())
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            PubSubError::Timeout {
                                pubsub_name: request.pubsub_name.to_string(),
                                topic: request.topic.to_string(),
                            }
                        } else if e.is_connect() {
                            PubSubError::ConnectionFailed(e.to_string())
                        } else {
                            publish_failed(e.to_string())
                        }
                    })?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(publish_failed(error_reason(status, response).await))
                }
            }
            .await;

            match &result {
                Ok(()) => {
                    PubSubMetrics::record_publish(request.topic, start.elapsed());
                    tracing::debug!(
                        pubsub = request.pubsub_name,
                        topic = request.topic,
                        bytes = request.data.len(),
                        "Message published"
                    );
                }
                Err(e) => {
                    PubSubMetrics::record_publish_error(request.topic);
                    tracing::error!(
                        pubsub = request.pubsub_name,
                        topic = request.topic,
                        error = %e,
                        "Failed to publish message"
                    );
                }
            }
            result
        })
    }
}

impl StateStore for DaprClient {
    fn get<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StateItem>, StateStoreError>> + Send + 'a>>
    {
        Box::pin(timed("get", self.fetch(store_name, key)))
    }

    fn save<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StateStoreError>> + Send + 'a>> {
        Box::pin(async move { timed("save", self.store(store_name, key, &value)).await })
    }

    fn delete<'a>(
        &'a self,
        store_name: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StateStoreError>> + Send + 'a>> {
        Box::pin(timed("delete", self.remove(store_name, key)))
    }
}

#[derive(Serialize)]
struct SaveStateItem<'a> {
    key: &'a str,
    value: serde_json::Value,
}

/// Stored values are JSON documents; anything else is stored as a string.
fn state_value(value: &[u8]) -> serde_json::Value {
    serde_json::from_slice(value).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(value).into_owned())
    })
}

async fn timed<T>(
    op: &'static str,
    operation: impl Future<Output = Result<T, StateStoreError>>,
) -> Result<T, StateStoreError> {
    let start = Instant::now();
    let result = operation.await;
    match &result {
        Ok(_) => StateStoreMetrics::record_operation(op, start.elapsed()),
        Err(e) => {
            StateStoreMetrics::record_error(op);
            tracing::error!(op, error = %e, "State store operation failed");
        }
    }
    result
}

fn operation_failed(store_name: &str, key: &str, reason: String) -> StateStoreError {
    StateStoreError::OperationFailed {
        store_name: store_name.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn state_transport_error(store_name: &str, key: &str, error: &reqwest::Error) -> StateStoreError {
    if error.is_timeout() {
        StateStoreError::Timeout {
            store_name: store_name.to_string(),
            key: key.to_string(),
        }
    } else if error.is_connect() {
        StateStoreError::ConnectionFailed(error.to_string())
    } else {
        operation_failed(store_name, key, error.to_string())
    }
}

async fn error_reason(status: StatusCode, response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("sidecar returned {status}")
    } else {
        format!("sidecar returned {status}: {body}")
    }
}
