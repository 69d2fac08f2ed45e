// Concurrency-limiting transport decorator.
//
// A single semaphore bounds the number of requests in flight across every
// caller sharing the decorated transport. Callers past the limit wait for
// a permit; permits are released when the exchange completes.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::Error;
use crate::transport::{RawResponse, Transport};

/// Limit used when the caller supplies 0.
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 5;

/// Wraps a [`Transport`] so at most `limit` requests run concurrently.
pub struct LimitedTransport<T> {
    inner: T,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl<T: Transport> LimitedTransport<T> {
    pub fn new(inner: T, limit: usize) -> Self {
        let limit = if limit == 0 {
            DEFAULT_CONCURRENT_REQUESTS
        } else {
            limit
        };
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for LimitedTransport<T> {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse, Error> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::LimiterClosed)?;
        trace!(
            path,
            available = self.permits.available_permits(),
            "acquired request slot"
        );
        self.inner.get(path, query).await
    }
}
