//! # Refetch HTTP
//!
//! The production [`Transport`] implementation, backed by [`reqwest`].
//!
//! [`ReqwestTransport`] maps a [`RequestDescriptor`] onto a `reqwest`
//! request (method, headers, body), performs it, and collects the status,
//! headers, and raw body into a [`TransportResponse`]. It does not retry,
//! cache, or interpret statuses; a completed exchange is a success at this
//! layer regardless of the status code.
//!
//! Dropping the in-flight future cancels the underlying request, which is
//! what lets the controller abandon superseded attempts at the network
//! layer.

use refetch_core::error::TransportError;
use refetch_core::request::{Method, RequestDescriptor};
use refetch_core::transport::{Transport, TransportFuture, TransportResponse};
use std::collections::BTreeMap;

/// A [`Transport`] backed by a shared [`reqwest::Client`].
///
/// Cloning is cheap and shares the underlying connection pool.
///
/// # Example
///
/// ```ignore
/// use refetch_http::ReqwestTransport;
/// use std::sync::Arc;
///
/// let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a transport around an existing client (custom timeouts,
    /// proxies, TLS configuration).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &RequestDescriptor) -> TransportFuture<'_> {
        let client = self.client.clone();
        let request = request.clone();

        Box::pin(async move {
            let mut builder = client.request(map_method(request.config.method), &request.url);
            for (name, value) in &request.config.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.config.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(into_transport_error)?;

            let status = response.status().as_u16();
            let mut headers = BTreeMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    headers.insert(name.as_str().to_string(), value.to_string());
                }
            }

            let body = response
                .bytes()
                .await
                .map_err(into_transport_error)?
                .to_vec();

            tracing::trace!(status, bytes = body.len(), "Transport exchange completed");

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}

const fn map_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn into_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else if error.is_builder() || error.is_request() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
