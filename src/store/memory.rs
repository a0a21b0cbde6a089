//! In-memory store implementation.
//!
//! Backs tests and single-process embedding. Expiry is lazy: an entry past
//! its deadline is dropped the next time a read or scan touches it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::error::Result;
use crate::store::{NO_EXPIRE, RemoteStore};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory [`RemoteStore`] with per-key TTL.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<Vec<u8>, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL in whole seconds for `key`.
    ///
    /// Mirrors the Redis `TTL` command: `None` for an absent key,
    /// `Some(NO_EXPIRE)` for a key without expiry.
    pub fn ttl_of(&self, key: &[u8]) -> Option<i64> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        match entry.expires_at {
            Some(deadline) => Some((deadline - now).as_secs() as i64),
            None => Some(NO_EXPIRE),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Evict lazily once the deadline has passed.
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl_seconds: i64) -> Result<()> {
        if ttl_seconds <= 0 && ttl_seconds != NO_EXPIRE {
            trace!(ttl_seconds, "skipping put with non-positive ttl");
            return Ok(());
        }
        let expires_at = if ttl_seconds == NO_EXPIRE {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_seconds as u64))
        };
        self.entries.insert(
            key.to_vec(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn scan_by_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let now = Instant::now();
        let keys = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        Ok(keys)
    }

    async fn approximate_count(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }
}
