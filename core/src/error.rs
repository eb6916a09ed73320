//! Error types for retrieval attempts.
//!
//! Errors are stored inside published [`RequestState`](crate::state::RequestState)
//! values, so every variant is `Clone` and underlying causes are captured as
//! strings rather than as source errors.

use thiserror::Error;

/// Errors raised by a [`Transport`](crate::transport::Transport) when the
/// network call itself could not complete.
///
/// A completed call with a non-success status is **not** a transport error;
/// the response is returned as-is and classified by the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established (DNS, refused, TLS).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport gave up waiting for the peer.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The request could not be constructed (bad URL, invalid header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport-level failure.
    #[error("Transport error: {0}")]
    Other(String),
}

/// The failure of one retrieval attempt, as published through
/// [`RequestState::error`](crate::state::RequestState::error).
///
/// Exactly three kinds exist:
///
/// 1. the network call failed ([`FetchError::Transport`]),
/// 2. the call completed with a non-success status ([`FetchError::RequestFailed`]),
/// 3. the body could not be decoded ([`FetchError::Decode`]).
///
/// `RequestFailed` deliberately carries no status code: the baseline contract
/// only distinguishes "ok" from "not ok".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The network call could not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("Request failed")]
    RequestFailed,

    /// The response body could not be deserialized into the expected shape.
    #[error("Response decoding failed: {0}")]
    Decode(String),
}
