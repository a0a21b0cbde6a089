//! Timeout decorator for remote stores.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::store::RemoteStore;

/// Wraps a [`RemoteStore`] and bounds every call with a timeout.
///
/// An elapsed timeout fails the operation with
/// [`Error::StoreUnavailable`]; nothing is retried. Retry policy, if any,
/// belongs to the caller.
pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::StoreUnavailable(format!(
                "store call timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for TimedStore<S> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.bounded(self.inner.get(key)).await
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl_seconds: i64) -> Result<()> {
        self.bounded(self.inner.put(key, value, ttl_seconds)).await
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.bounded(self.inner.delete(key)).await
    }

    async fn scan_by_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.bounded(self.inner.scan_by_prefix(prefix)).await
    }

    async fn approximate_count(&self) -> Result<u64> {
        self.bounded(self.inner.approximate_count()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Store whose reads hang forever, to exercise the timeout path.
    struct StalledStore;

    #[async_trait]
    impl RemoteStore for StalledStore {
        async fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn put(&self, _key: &[u8], _value: &[u8], _ttl_seconds: i64) -> Result<()> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &[u8]) -> Result<()> {
            std::future::pending().await
        }

        async fn scan_by_prefix(&self, _prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
            std::future::pending().await
        }

        async fn approximate_count(&self) -> Result<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn timeout_maps_to_store_unavailable() {
        let store = TimedStore::new(StalledStore, Duration::from_millis(10));
        let err = store.get(b"k").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn passes_through_within_budget() {
        let store = TimedStore::new(MemoryStore::new(), Duration::from_secs(1));
        store.put(b"k", b"v", 60).await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }
}
