//! Single-retry handling of HTTP 429.
//!
//! [`RateLimitedTransport`] wraps another transport. A 429 response is read in
//! full, reported once through the [`EventSink`], and the same request is sent
//! one more time after a fixed back-off. Whatever the second attempt returns
//! is final, including a second 429. Connection failures are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use migration::{EventSink, MigrationEvent};

use crate::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Back-off between a 429 and its retry.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

const TOO_MANY_REQUESTS: u16 = 429;

pub struct RateLimitedTransport<T> {
    inner: T,
    events: Arc<dyn EventSink>,
    backoff: Duration,
}

impl<T: HttpTransport> RateLimitedTransport<T> {
    pub fn new(inner: T, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner,
            events,
            backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RateLimitedTransport<T> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let first = self.inner.execute(request).await?;
        if first.status != TOO_MANY_REQUESTS {
            return Ok(first);
        }

        self.events.emit(MigrationEvent::RateLimited {
            body: first.text(),
            backoff: self.backoff,
        });
        tokio::time::sleep(self.backoff).await;

        self.inner.execute(request).await
    }
}
