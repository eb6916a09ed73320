//! # Refetch Runtime
//!
//! Runtime implementation for the refetch architecture.
//!
//! This crate provides the [`RequestController`]: the state machine that
//! governs when a fetch starts, how its outcome is published, and how
//! overlapping fetches are ordered.
//!
//! ## Core Components
//!
//! - **[`RequestController`]**: owns the published lifecycle state, starts
//!   attempts, and commits outcomes
//! - **Dependency-triggered re-execution**: [`RequestController::set_request`]
//!   starts a new attempt only when the descriptor changes by value
//! - **Manual re-execution**: [`RequestController::refetch`] with optional
//!   one-shot overrides
//!
//! ## Ordering contract
//!
//! Attempts may overlap: a second attempt can start while the first is still
//! in flight. The controller guarantees **last-started-wins**: each attempt
//! carries a sequence number taken at start time, and an outcome commits only
//! if its attempt is still the most recently started one. A superseded
//! attempt is additionally aborted at the network layer (configurable via
//! [`ControllerConfig`]); the sequence check remains in force regardless, as
//! the correctness backstop.
//!
//! ## Example
//!
//! ```ignore
//! use refetch_http::ReqwestTransport;
//! use refetch_runtime::RequestController;
//! use std::sync::Arc;
//!
//! #[derive(Clone, serde::Deserialize)]
//! struct Item { v: u32 }
//!
//! let transport = Arc::new(ReqwestTransport::new());
//! let controller = RequestController::<Item>::get(transport, "https://x/1");
//!
//! let mut subscription = controller.subscribe();
//! let settled = subscription.wait_for(|s| s.is_settled()).await?;
//! println!("data: {:?}", settled.data.map(|item| item.v));
//!
//! controller.refetch(None, None);
//! ```

use refetch_core::error::FetchError;
use refetch_core::observable::{Observable, Subscription};
use refetch_core::request::{RequestConfig, RequestDescriptor};
use refetch_core::state::RequestState;
use refetch_core::transport::Transport;
use refetch_core::watcher::DependencyWatcher;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::AbortHandle;

/// Configuration for [`RequestController`] instances.
///
/// # Example
///
/// ```
/// use refetch_runtime::ControllerConfig;
///
/// let config = ControllerConfig::default().with_cancel_superseded(false);
/// assert!(!config.cancel_superseded);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ControllerConfig {
    /// Abort a superseded attempt's task, cancelling its network call.
    ///
    /// When false, superseded attempts run to completion and are discarded
    /// at commit time by the sequence check alone. The check applies in
    /// both modes; this flag only controls the network-layer cancellation.
    pub cancel_superseded: bool,
}

impl ControllerConfig {
    /// Create a configuration with default settings.
    ///
    /// Defaults:
    /// - `cancel_superseded`: true
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancel_superseded: true,
        }
    }

    /// Set whether superseded attempts are aborted at the network layer.
    #[must_use]
    pub const fn with_cancel_superseded(mut self, cancel: bool) -> Self {
        self.cancel_superseded = cancel;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The request lifecycle controller.
///
/// The controller manages:
/// 1. The published [`RequestState`] (it is the state's only writer)
/// 2. Attempt orchestration (transport call plus decode, one task per attempt)
/// 3. Automatic re-execution when the descriptor changes by value
/// 4. Manual re-execution via [`refetch`](Self::refetch)
///
/// Construction starts the first attempt immediately: the controller begins
/// in the pending state, never idle.
///
/// # Type Parameters
///
/// - `T`: the decoded response type (`serde` deserializable)
///
/// # Example
///
/// ```ignore
/// let controller = RequestController::<serde_json::Value>::get(transport, "https://x/1");
/// let state = controller.state();
/// assert!(state.loading);
/// ```
pub struct RequestController<T> {
    inner: Arc<ControllerInner<T>>,
}

struct ControllerInner<T> {
    transport: Arc<dyn Transport>,
    state: Observable<RequestState<T>>,
    watcher: DependencyWatcher<RequestDescriptor>,
    sequence: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    config: ControllerConfig,
}

impl<T> RequestController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a controller and start its first attempt.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (attempts are spawned
    /// tasks).
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Self {
        Self::with_config(transport, url, config, ControllerConfig::default())
    }

    /// Create a controller for a plain GET of `url`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn get(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        Self::new(transport, url, RequestConfig::default())
    }

    /// Create a controller with custom runtime configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_config(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        config: RequestConfig,
        controller_config: ControllerConfig,
    ) -> Self {
        let descriptor = RequestDescriptor::new(url, config);
        let inner = Arc::new(ControllerInner {
            transport,
            state: Observable::new(RequestState::pending()),
            watcher: DependencyWatcher::new(descriptor.clone()),
            sequence: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            config: controller_config,
        });

        inner.start_attempt(descriptor);
        Self { inner }
    }

    /// Snapshot the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RequestState<T> {
        self.inner.state.get()
    }

    /// Subscribe to lifecycle state commits.
    ///
    /// Dropping the returned handle unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<RequestState<T>> {
        self.inner.state.subscribe()
    }

    /// The descriptor automatic triggering currently compares against.
    #[must_use]
    pub fn descriptor(&self) -> RequestDescriptor {
        self.inner.watcher.current()
    }

    /// Rebind the active descriptor, starting a new attempt on change.
    ///
    /// This is the automatic-trigger entry point: the new descriptor is
    /// compared by value against the active one, and an attempt starts only
    /// when they differ. Re-submitting an identical descriptor is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn set_request(&self, url: impl Into<String>, config: RequestConfig) {
        let descriptor = RequestDescriptor::new(url, config);
        if self.inner.watcher.observe(&descriptor) {
            self.inner.start_attempt(descriptor);
        } else {
            tracing::trace!(request = %descriptor, "Descriptor unchanged, no attempt started");
        }
    }

    /// Start a fresh attempt on demand.
    ///
    /// Overrides are **one-shot**: an attempt run with an override locator
    /// or configuration does not rebind the active descriptor, so future
    /// automatic triggering still compares against the descriptor last
    /// bound via [`set_request`](Self::set_request) (or construction).
    /// Absent overrides fall back to the active descriptor's values.
    ///
    /// May be called at any time, including while another attempt is
    /// outstanding; the ordering contract applies.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn refetch(&self, url: Option<String>, config: Option<RequestConfig>) {
        let active = self.inner.watcher.current();
        let descriptor = RequestDescriptor::new(
            url.unwrap_or(active.url),
            config.unwrap_or(active.config),
        );
        self.inner.start_attempt(descriptor);
    }
}

impl<T> std::fmt::Debug for RequestController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestController")
            .field("descriptor", &self.inner.watcher.current())
            .field("sequence", &self.inner.sequence.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T> ControllerInner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Start one attempt: supersede the previous one, publish the pending
    /// transition, and spawn the retrieval task.
    fn start_attempt(self: &Arc<Self>, descriptor: RequestDescriptor) {
        // The in-flight lock spans sequencing, cancellation, and handle
        // replacement so concurrent triggers serialize as whole starts.
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;

        if let Some(previous) = in_flight.take() {
            if self.config.cancel_superseded {
                previous.abort();
            }
        }

        tracing::debug!(sequence, request = %descriptor, "Starting attempt");
        metrics::counter!("controller.attempts.total").increment(1);

        self.state.update(RequestState::begin);

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let started = std::time::Instant::now();
            let outcome = inner.run_attempt(&descriptor).await;
            metrics::histogram!("controller.attempt.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            inner.commit(sequence, outcome);
        });

        *in_flight = Some(task.abort_handle());
    }

    /// One retrieval plus decode, from start to terminal outcome.
    #[tracing::instrument(skip_all, fields(request = %descriptor), name = "attempt")]
    async fn run_attempt(&self, descriptor: &RequestDescriptor) -> Result<T, FetchError> {
        let response = self.transport.execute(descriptor).await?;

        if !response.is_success() {
            tracing::debug!(status = response.status, "Non-success response");
            return Err(FetchError::RequestFailed);
        }

        serde_json::from_slice(&response.body).map_err(|error| FetchError::Decode(error.to_string()))
    }

    /// Commit a terminal outcome, unless the attempt has been superseded.
    fn commit(&self, sequence: u64, outcome: Result<T, FetchError>) {
        let failed = outcome.is_err();

        // The sequence check runs inside the same critical section as the
        // state write, so a newer attempt's commits cannot interleave with
        // this one.
        let committed = self.state.update_if(|state| {
            if self.sequence.load(Ordering::Acquire) != sequence {
                return false;
            }
            match outcome {
                Ok(value) => state.complete(value),
                Err(error) => state.fail(error),
            }
            true
        });

        if committed {
            tracing::debug!(sequence, failed, "Committed attempt outcome");
            if failed {
                metrics::counter!("controller.attempts.failed").increment(1);
            }
        } else {
            tracing::debug!(sequence, "Discarding superseded attempt outcome");
            metrics::counter!("controller.attempts.stale_discarded").increment(1);
        }
    }
}
