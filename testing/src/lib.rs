//! # Refetch Testing
//!
//! Testing utilities and helpers for the refetch architecture.
//!
//! This crate provides:
//! - Mock implementations of the [`Transport`] trait
//! - Response builders for common stub shapes
//! - A tracing initializer for test binaries
//!
//! Two transports cover the two kinds of tests:
//!
//! - [`MockTransport`] resolves immediately from scripted per-URL outcomes.
//!   Use it for straight-line lifecycle tests.
//! - [`ManualTransport`] parks every request until the test resolves it by
//!   hand. Use it to pin down interleavings (who resolves first, what gets
//!   superseded).
//!
//! ## Example
//!
//! ```ignore
//! use refetch_testing::{json_response, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));
//!
//! let controller = RequestController::<Value>::get(transport.clone(), "https://x/1");
//! ```

use refetch_core::error::TransportError;
use refetch_core::request::RequestDescriptor;
use refetch_core::transport::{Transport, TransportFuture, TransportResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

/// The outcome a mock transport resolves a request with.
pub type TransportOutcome = Result<TransportResponse, TransportError>;

/// Build a response carrying a JSON body.
#[must_use]
pub fn json_response(status: u16, body: &str) -> TransportResponse {
    TransportResponse::new(status)
        .with_header("content-type", "application/json")
        .with_body(body.as_bytes().to_vec())
}

/// Initialize tracing for tests.
///
/// Respects `RUST_LOG` and writes through the test writer so output is
/// captured per test. Safe to call from every test; only the first call
/// installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A transport with scripted per-URL outcomes.
///
/// Every executed request is recorded, so tests can assert how often (and
/// with what descriptor) a URL was fetched. Requests for URLs without a
/// stub resolve to a connection failure naming the URL.
#[derive(Debug, Default)]
pub struct MockTransport {
    stubs: Mutex<HashMap<String, TransportOutcome>>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    /// Create a transport with no stubs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for a URL. Replaces any previous stub.
    pub fn stub(&self, url: impl Into<String>, outcome: TransportOutcome) {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), outcome);
    }

    /// All descriptors executed so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times a URL has been fetched.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|descriptor| descriptor.url == url)
            .count()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &RequestDescriptor) -> TransportFuture<'_> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let outcome = self
            .stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::ConnectionFailed(format!(
                    "no stub for {}",
                    request.url
                )))
            });

        Box::pin(async move { outcome })
    }
}

/// A transport whose requests stay in flight until the test resolves them.
///
/// Each `execute` call parks on a oneshot channel keyed by URL; the test
/// later calls [`resolve`](Self::resolve) or
/// [`resolve_err`](Self::resolve_err) to complete the oldest parked request
/// for that URL. This makes interleavings explicit: the test decides which
/// attempt finishes first.
///
/// An aborted attempt drops its receiver; resolving it afterwards returns
/// false, which tests use to prove the network-layer cancellation happened.
#[derive(Debug, Default)]
pub struct ManualTransport {
    parked: Mutex<HashMap<String, VecDeque<oneshot::Sender<TransportOutcome>>>>,
}

impl ManualTransport {
    /// Create a transport with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the oldest parked request for `url` with a response.
    ///
    /// Returns false when nothing is parked for `url`, or when the waiting
    /// attempt has been dropped (e.g. aborted as superseded).
    pub fn resolve(&self, url: &str, response: TransportResponse) -> bool {
        self.complete(url, Ok(response))
    }

    /// Complete the oldest parked request for `url` with a transport error.
    ///
    /// Returns false under the same conditions as [`resolve`](Self::resolve).
    pub fn resolve_err(&self, url: &str, error: TransportError) -> bool {
        self.complete(url, Err(error))
    }

    /// How many requests are currently parked for `url`.
    #[must_use]
    pub fn pending_count(&self, url: &str) -> usize {
        self.parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map_or(0, VecDeque::len)
    }

    fn complete(&self, url: &str, outcome: TransportOutcome) -> bool {
        let sender = self
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

impl Transport for ManualTransport {
    fn execute(&self, request: &RequestDescriptor) -> TransportFuture<'_> {
        let (sender, receiver) = oneshot::channel();
        self.parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.url.clone())
            .or_default()
            .push_back(sender);

        Box::pin(async move {
            receiver.await.unwrap_or_else(|_| {
                Err(TransportError::ConnectionFailed(
                    "manual transport dropped".to_string(),
                ))
            })
        })
    }
}
