//! # Refetch Core
//!
//! Core types and traits for the refetch reactive data-fetching architecture.
//!
//! This crate provides the fundamental abstractions for building reactive
//! request pipelines:
//!
//! - **[`RequestState`]**: the published lifecycle of a retrieval
//!   (`data` / `loading` / `error`)
//! - **[`RequestDescriptor`]**: locator plus configuration, compared by value
//! - **[`Transport`]**: the seam to the underlying HTTP client
//! - **[`Observable`]**: a single-writer value with explicit subscriptions
//! - **[`DependencyWatcher`]**: re-run a trigger when an input changes by value
//!
//! ## Architecture Principles
//!
//! - Explicit reactive substrate (no ambient subscription registry)
//! - One writer per published value, unboundedly many readers
//! - Dependencies injected via traits (`Transport` is a trait object seam)
//! - Errors are values committed into state, never uncaught failures
//!
//! ## Example
//!
//! ```ignore
//! use refetch_core::{Observable, RequestState};
//!
//! let state = Observable::new(RequestState::<u32>::pending());
//! let mut subscription = state.subscribe();
//!
//! state.update(|s| s.complete(7));
//!
//! let settled = subscription.wait_for(|s| !s.loading).await?;
//! assert!(settled.error.is_none());
//! ```

pub mod error;
pub mod observable;
pub mod request;
pub mod state;
pub mod transport;
pub mod watcher;

pub use error::{FetchError, TransportError};
pub use observable::{Observable, Subscription, SubscriptionClosed};
pub use request::{Method, RequestConfig, RequestDescriptor};
pub use state::RequestState;
pub use transport::{Transport, TransportFuture, TransportResponse};
pub use watcher::DependencyWatcher;
