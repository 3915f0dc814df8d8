//! Jira infrastructure adapter for tracker-migrate.
//!
//! Implements the [`migration::IssueTracker`] port against the Jira REST API
//! v2.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, Basic authentication, request encoding,
//! response decoding, and the single 429 retry all live here. The `engine`
//! crate sees only [`migration::IssueTracker`].
//!
//! ## Transport stack
//!
//! ```text
//! JiraClient ──► RateLimitedTransport ──► ReqwestTransport ──► network
//! ```
//!
//! Both transports implement [`HttpTransport`], so tests substitute a scripted
//! transport underneath either layer.

pub mod client;
pub mod config;
pub mod errors;
pub mod multipart;
pub mod payloads;
pub mod rate_limit;
pub mod transport;

pub use client::JiraClient;
pub use config::{JiraConfig, DEFAULT_STORY_POINT_FIELD};
pub use errors::TransportError;
pub use multipart::MultipartForm;
pub use rate_limit::{RateLimitedTransport, DEFAULT_RATE_LIMIT_BACKOFF};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, DEFAULT_REQUEST_TIMEOUT,
};
