//! Remote key-value store boundary.
//!
//! The durable tier is any byte-key/byte-value store with per-key TTL and
//! best-effort prefix scanning. The session store and cache regions only
//! ever talk to this trait; the in-memory implementation exists for tests
//! and embedding.

mod memory;
mod timed;

pub use memory::MemoryStore;
pub use timed::TimedStore;

use async_trait::async_trait;

use crate::error::Result;

/// TTL sentinel meaning "no expiry".
///
/// Any other `ttl_seconds <= 0` makes the `put` a no-op.
pub const NO_EXPIRE: i64 = -1;

/// A remote byte-key/byte-value store with per-key TTL.
///
/// All calls are synchronous network round trips from the caller's
/// perspective; none of them retry internally. Single-key operations are
/// expected to be atomic on the store side; nothing else is.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key` with the given TTL.
    ///
    /// `ttl_seconds` follows the [`NO_EXPIRE`] sentinel semantics: `-1`
    /// stores without expiry, any other non-positive value skips the write.
    async fn put(&self, key: &[u8], value: &[u8], ttl_seconds: i64) -> Result<()>;

    /// Delete the entry for `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Return all keys starting with `prefix`.
    ///
    /// Best-effort and non-transactional: concurrent writers may be missed
    /// or double-observed.
    async fn scan_by_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Approximate total number of entries in the store.
    async fn approximate_count(&self) -> Result<u64>;
}
