//! Buffered HTTP requests and the transports that send them.
//!
//! Every request body is held in memory as bytes before the first send, so a
//! transport can send the same [`HttpRequest`] any number of times and each
//! attempt carries identical content.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::TransportError;

/// Timeout applied to every request sent by [`ReqwestTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully buffered, re-sendable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Builds a request whose body is `payload` encoded as JSON.
    pub fn json<T: Serialize + ?Sized>(
        method: Method,
        url: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;
        Ok(Self::new(method, url)
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends one [`HttpRequest`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport authenticating every request with HTTP Basic
/// auth (account e-mail + API token).
pub struct ReqwestTransport {
    client: reqwest::Client,
    email: String,
    api_token: String,
}

impl ReqwestTransport {
    pub fn new(
        email: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            client,
            email: email.into(),
            api_token: api_token.into(),
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let failed = |e: reqwest::Error| TransportError::Send {
            method: request.method.clone(),
            url: request.url.clone(),
            message: e.to_string(),
        };

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .basic_auth(&self.email, Some(&self.api_token));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(failed)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(failed)?.to_vec();
        debug!(method = %request.method, url = %request.url, status, "request completed");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_request_carries_content_type_and_encoded_body() {
        let request =
            HttpRequest::json(Method::POST, "https://x/rest", &serde_json::json!({"a": 1}))
                .unwrap();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[test]
    fn response_helpers_decode_the_body() {
        let response = HttpResponse::new(201, r#"{"key":"PROJ-1"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["key"], "PROJ-1");
        assert_eq!(response.text(), r#"{"key":"PROJ-1"}"#);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let transport = ReqwestTransport::new("me@x", "s3cret", DEFAULT_REQUEST_TIMEOUT).unwrap();
        let rendered = format!("{transport:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("me@x"));
    }
}
