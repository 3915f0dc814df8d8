//! In-memory `multipart/form-data` encoding.
//!
//! The form is assembled into one byte buffer so the request stays
//! re-sendable by [`RateLimitedTransport`](crate::RateLimitedTransport).

use uuid::Uuid;

/// Content type of file parts.
const FILE_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("tracker-migrate-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    /// Appends a file part under form field `field`.
    #[must_use]
    pub fn file(mut self, field: &str, file_name: &str, contents: &[u8]) -> Self {
        let head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.boundary,
            escape_quotes(field),
            escape_quotes(file_name),
            FILE_CONTENT_TYPE,
        );
        self.body.extend_from_slice(head.as_bytes());
        self.body.extend_from_slice(contents);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Closes the form and returns the encoded body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
