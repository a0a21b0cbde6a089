//! A named, prefix-namespaced cache backed by the remote store.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::codec::{JsonValueCodec, KeyCodec, Utf8KeyCodec, ValueCodec};
use crate::config::CacheRegionConfig;
use crate::error::Result;
use crate::keys::KeyDeriver;
use crate::store::RemoteStore;

/// A named cache mapping derived logical keys to values of type `V`.
///
/// Entries are replace-only: a `put` fully overwrites any prior value.
/// Bulk operations (`keys`, `values`, `size`, `clear`) ride on a
/// best-effort prefix scan and are neither atomic nor isolated from
/// concurrent writers.
pub struct CacheRegion<K, V> {
    name: Arc<str>,
    config: CacheRegionConfig,
    store: Arc<dyn RemoteStore>,
    key_codec: Arc<dyn KeyCodec>,
    value_codec: Arc<dyn ValueCodec<V>>,
    deriver: Arc<dyn KeyDeriver<K>>,
}

// Manual Clone: clones share the same backing handles, whatever K and V are.
impl<K, V> Clone for CacheRegion<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            key_codec: Arc::clone(&self.key_codec),
            value_codec: Arc::clone(&self.value_codec),
            deriver: Arc::clone(&self.deriver),
        }
    }
}

impl<K, V> CacheRegion<K, V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a region with the default UTF-8/JSON codecs.
    pub fn new(
        name: impl Into<Arc<str>>,
        config: CacheRegionConfig,
        store: Arc<dyn RemoteStore>,
        deriver: Arc<dyn KeyDeriver<K>>,
    ) -> Self {
        Self::with_codecs(
            name,
            config,
            store,
            Arc::new(Utf8KeyCodec),
            Arc::new(JsonValueCodec::new()),
            deriver,
        )
    }
}

impl<K, V> CacheRegion<K, V> {
    /// Create a region with caller-supplied codecs.
    pub fn with_codecs(
        name: impl Into<Arc<str>>,
        config: CacheRegionConfig,
        store: Arc<dyn RemoteStore>,
        key_codec: Arc<dyn KeyCodec>,
        value_codec: Arc<dyn ValueCodec<V>>,
        deriver: Arc<dyn KeyDeriver<K>>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            store,
            key_codec,
            value_codec,
            deriver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheRegionConfig {
        &self.config
    }

    pub(crate) fn name_handle(&self) -> &Arc<str> {
        &self.name
    }

    /// Fetch the value cached under `key`.
    ///
    /// `Ok(None)` on a miss; a present-but-undecodable entry surfaces as
    /// [`crate::Error::Deserialize`].
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let raw_key = self.raw_key(key)?;
        let Some(raw_value) = self.store.get(&raw_key).await? else {
            return Ok(None);
        };
        let value = self.value_codec.decode(&raw_value)?;
        Ok(Some(value))
    }

    /// Write-through `value` under `key` with the region's TTL.
    pub async fn put(&self, key: &K, value: &V) -> Result<()> {
        let raw_key = self.raw_key(key)?;
        let raw_value = self.value_codec.encode(value)?;
        debug!(region = %self.name, "cache put");
        self.store
            .put(&raw_key, &raw_value, self.config.ttl.as_store_ttl())
            .await
    }

    /// Remove the entry for `key`, returning the previous value if any.
    pub async fn remove(&self, key: &K) -> Result<Option<V>> {
        let raw_key = self.raw_key(key)?;
        let previous = match self.store.get(&raw_key).await? {
            Some(raw_value) => Some(self.value_codec.decode(&raw_value)?),
            None => None,
        };
        self.store.delete(&raw_key).await?;
        Ok(previous)
    }

    /// Remove the entry for an already-derived logical key.
    ///
    /// Invalidation recomputes keys from whichever credential shape it
    /// holds and removes through this, skipping the typed `K`.
    pub(crate) async fn remove_derived(&self, derived: &str) -> Result<()> {
        let raw_key = self
            .key_codec
            .encode(&self.store_key(derived))?;
        self.store.delete(&raw_key).await
    }

    /// Delete every entry under this region's prefix.
    ///
    /// Not atomic: writers inserting during the sweep survive it. A
    /// per-key delete failure is logged and skipped.
    pub async fn clear(&self) -> Result<()> {
        debug!(region = %self.name, "clearing cache region");
        let raw_keys = self.scan().await?;
        for raw_key in raw_keys {
            if let Err(e) = self.store.delete(&raw_key).await {
                warn!(
                    region = %self.name,
                    key = ?String::from_utf8_lossy(&raw_key),
                    error = %e,
                    "failed to delete key during clear"
                );
            }
        }
        Ok(())
    }

    /// Best-effort snapshot of the logical keys in this region.
    ///
    /// Undecodable keys are logged and skipped.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let raw_keys = self.scan().await?;
        let mut keys = Vec::with_capacity(raw_keys.len());
        for raw_key in raw_keys {
            match self.key_codec.decode(&raw_key) {
                Ok(full) => {
                    let logical = full
                        .strip_prefix(&self.config.key_prefix)
                        .unwrap_or(&full)
                        .to_string();
                    keys.push(logical);
                }
                Err(e) => {
                    warn!(region = %self.name, error = %e, "skipping undecodable key");
                }
            }
        }
        Ok(keys)
    }

    /// Best-effort snapshot of the values in this region.
    ///
    /// Entries that vanish mid-scan or fail to decode are logged and
    /// skipped.
    pub async fn values(&self) -> Result<Vec<V>> {
        let raw_keys = self.scan().await?;
        let mut values = Vec::with_capacity(raw_keys.len());
        for raw_key in raw_keys {
            let raw_value = match self.store.get(&raw_key).await {
                Ok(Some(raw_value)) => raw_value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(region = %self.name, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            match self.value_codec.decode(&raw_value) {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!(region = %self.name, error = %e, "skipping corrupt entry");
                }
            }
        }
        Ok(values)
    }

    /// Approximate number of entries under this region's prefix.
    ///
    /// Derived from the same best-effort scan as [`keys`](Self::keys);
    /// not authoritative under concurrent mutation.
    pub async fn size(&self) -> Result<usize> {
        Ok(self.scan().await?.len())
    }

    async fn scan(&self) -> Result<Vec<Vec<u8>>> {
        let prefix = self.key_codec.encode(&self.config.key_prefix)?;
        self.store.scan_by_prefix(&prefix).await
    }

    fn raw_key(&self, key: &K) -> Result<Vec<u8>> {
        let derived = self.deriver.derive(key)?;
        self.key_codec.encode(&self.store_key(&derived))
    }

    fn store_key(&self, derived: &str) -> String {
        format!("{}{}", self.config.key_prefix, derived)
    }
}

impl<K, V> std::fmt::Debug for CacheRegion<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegion")
            .field("name", &self.name)
            .field("key_prefix", &self.config.key_prefix)
            .finish()
    }
}
