//! The transport seam: how the controller reaches the network.
//!
//! The controller never talks to an HTTP client directly. It sees only the
//! [`Transport`] trait: "perform this request, give me a status, headers,
//! and a body, or a transport error". This keeps the orchestration logic
//! independent of the client crate and makes attempts trivially mockable.

use crate::error::TransportError;
use crate::request::RequestDescriptor;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed future resolving to a transport outcome.
///
/// Used instead of `async fn` so the trait stays dyn-compatible
/// (`Arc<dyn Transport>`), which the controller needs in order to be
/// generic-free over the client implementation.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// A completed network exchange: status code, headers, raw body.
///
/// A non-success status is still a *successful transport call*; classifying
/// the status is the controller's job, not the transport's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: u16,

    /// Response headers, ordered by name.
    pub headers: BTreeMap<String, String>,

    /// The raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create an empty response with the given status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Trait for transport implementations.
///
/// Implementations perform one request described by a [`RequestDescriptor`]
/// and resolve with the raw response. They must not retry, cache, or
/// interpret statuses; those concerns belong to callers.
///
/// # Cancellation
///
/// Dropping the returned future must abandon the underlying network call.
/// The controller relies on this to cancel superseded attempts at the
/// network layer.
///
/// # Dyn Compatibility
///
/// This trait uses an explicit boxed-future return instead of `async fn` to
/// enable trait-object usage (`Arc<dyn Transport>`). Implementations should
/// clone whatever they need from `request` before entering their async
/// block.
pub trait Transport: Send + Sync {
    /// Perform the request and resolve with the raw response.
    ///
    /// # Errors
    ///
    /// Resolves to a [`TransportError`] only when the network call itself
    /// could not complete; a completed call with a failure status resolves
    /// to `Ok`.
    fn execute(&self, request: &RequestDescriptor) -> TransportFuture<'_>;
}
