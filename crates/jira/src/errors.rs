//! Transport-level errors.

use reqwest::Method;
use thiserror::Error;

/// The request did not yield an HTTP response.
///
/// Status codes, including 429 after its single retry, are never errors at
/// this level; they are returned as an [`HttpResponse`](crate::HttpResponse)
/// and judged by the client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS, timeout, or body read failure.
    #[error("{method} {url}: {message}")]
    Send {
        method: Method,
        url: String,
        message: String,
    },
}
