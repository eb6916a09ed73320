//! Request descriptors: the locator and configuration of one retrieval.
//!
//! A [`RequestDescriptor`] identifies *what* to fetch. Descriptor identity is
//! value identity: two descriptors with the same locator, method, headers,
//! and body are the same request, regardless of how they were built. The
//! [`DependencyWatcher`](crate::watcher::DependencyWatcher) relies on this to
//! decide whether an automatic re-execution is warranted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for [`Method`] parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid request method: {0}")]
pub struct ParseMethodError(String);

/// The request verb.
///
/// Defaults to [`Method::Get`], matching the "GET-equivalent unless told
/// otherwise" contract of the public entry point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Retrieve a representation of the resource.
    #[default]
    Get,
    /// Submit a payload to the resource.
    Post,
    /// Replace the resource with the payload.
    Put,
    /// Apply a partial update to the resource.
    Patch,
    /// Remove the resource.
    Delete,
    /// Like GET, but without a response body.
    Head,
}

impl Method {
    /// Get the canonical uppercase name of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            other => Err(ParseMethodError(other.to_string())),
        }
    }
}

/// Transport-level configuration for one request.
///
/// Headers live in a `BTreeMap` so that configuration identity does not
/// depend on insertion order. The body is a raw payload; serialization is
/// the caller's responsibility.
///
/// # Examples
///
/// ```
/// use refetch_core::request::{Method, RequestConfig};
///
/// let config = RequestConfig::new()
///     .with_method(Method::Post)
///     .with_header("content-type", "application/json")
///     .with_body(r#"{"name":"example"}"#.as_bytes().to_vec());
///
/// assert_eq!(config.method, Method::Post);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// The request verb. Defaults to GET.
    pub method: Method,

    /// Header name/value pairs, ordered by name.
    pub headers: BTreeMap<String, String>,

    /// Raw request payload, if any.
    pub body: Option<Vec<u8>>,
}

impl RequestConfig {
    /// Create an empty configuration (GET, no headers, no body).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request verb.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the raw request payload.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Locator plus configuration: the full identity of one retrieval.
///
/// Descriptors are supplied by the caller and read-only to the controller.
/// Equality is derived field-by-field, which is exactly the identity the
/// watcher compares to decide whether to start a new automatic attempt.
///
/// # Examples
///
/// ```
/// use refetch_core::request::{RequestConfig, RequestDescriptor};
///
/// let a = RequestDescriptor::new("https://api.example.com/items", RequestConfig::new());
/// let b = RequestDescriptor::get("https://api.example.com/items");
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// The address of the resource to retrieve.
    pub url: String,

    /// Transport-level options for the retrieval.
    pub config: RequestConfig,
}

impl RequestDescriptor {
    /// Create a descriptor from a locator and configuration.
    #[must_use]
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }

    /// Create a plain GET descriptor with default configuration.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, RequestConfig::default())
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.config.method, self.url)
    }
}
