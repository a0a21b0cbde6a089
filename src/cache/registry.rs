//! Cache registry - central management for all named regions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cache::CacheRegion;
use crate::config::CacheRegionConfig;
use crate::error::{Error, Result};
use crate::keys::KeyDeriver;
use crate::store::RemoteStore;

/// Central registry holding at most one [`CacheRegion`] per name.
///
/// The registry is an explicitly constructed object handed to the
/// components that need it; there is no process-wide instance. Creation
/// is insert-if-absent under one lock, so concurrent first access for
/// the same name always converges on a single region.
#[derive(Clone)]
pub struct CacheRegistry {
    store: Arc<dyn RemoteStore>,
    regions: Arc<RwLock<HashMap<String, RegionEntry>>>,
}

/// Internal registry entry storing a type-erased region.
struct RegionEntry {
    region: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl CacheRegistry {
    /// Create a new empty registry over the given store.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        info!("cache registry initialized");
        Self {
            store,
            regions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the region registered under `name`, or create it.
    ///
    /// The first creation for a name wins; later callers (including
    /// concurrent ones) receive the existing instance and their `config`
    /// and `deriver` arguments are ignored.
    ///
    /// # Errors
    /// [`Error::InvalidRegionName`] if `name` is empty or blank.
    ///
    /// # Panics
    /// Panics if a region with the same name but different key/value
    /// types already exists; that is a programmer error.
    pub fn get_or_create<K, V>(
        &self,
        name: &str,
        config: CacheRegionConfig,
        deriver: Arc<dyn KeyDeriver<K>>,
    ) -> Result<CacheRegion<K, V>>
    where
        K: 'static,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(Error::InvalidRegionName);
        }

        let mut regions = self.regions.write();

        if let Some(existing) = regions.get(name) {
            return Ok(downcast_entry::<K, V>(name, existing).clone());
        }

        debug!(name, "creating cache region");
        let region = CacheRegion::<K, V>::new(name, config, Arc::clone(&self.store), deriver);
        regions.insert(
            name.to_string(),
            RegionEntry {
                region: Box::new(region.clone()),
                type_id: TypeId::of::<CacheRegion<K, V>>(),
                type_name: std::any::type_name::<CacheRegion<K, V>>(),
            },
        );

        Ok(region)
    }

    /// Get an existing region by name.
    ///
    /// Returns `None` if no region is registered under `name`.
    ///
    /// # Panics
    /// Panics if the region exists but with different key/value types.
    pub fn get<K, V>(&self, name: &str) -> Option<CacheRegion<K, V>>
    where
        K: 'static,
        V: 'static,
    {
        let regions = self.regions.read();
        regions
            .get(name)
            .map(|entry| downcast_entry::<K, V>(name, entry).clone())
    }

    /// Tear down every registered region and clear the registry.
    ///
    /// Regions hold no resources beyond shared store handles, so
    /// teardown is logging plus dropping; intended for process shutdown.
    pub fn destroy_all(&self) {
        let mut regions = self.regions.write();
        for name in regions.keys() {
            debug!(name = %name, "tearing down cache region");
        }
        regions.clear();
    }

    /// Check if a region with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.regions.read().contains_key(name)
    }

    /// Number of registered regions.
    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }

    /// Names of all registered regions.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.read().keys().cloned().collect()
    }
}

fn downcast_entry<'a, K, V>(name: &str, entry: &'a RegionEntry) -> &'a CacheRegion<K, V>
where
    K: 'static,
    V: 'static,
{
    let expected = TypeId::of::<CacheRegion<K, V>>();
    if entry.type_id != expected {
        panic!(
            "cache region '{}' already exists with different types: expected {}, got {}",
            name,
            std::any::type_name::<CacheRegion<K, V>>(),
            entry.type_name
        );
    }
    entry
        .region
        .downcast_ref::<CacheRegion<K, V>>()
        .unwrap_or_else(|| {
            panic!(
                "cache region '{}' failed to downcast to {}",
                name,
                std::any::type_name::<CacheRegion<K, V>>()
            )
        })
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let regions = self.regions.read();
        f.debug_struct("CacheRegistry")
            .field("region_count", &regions.len())
            .field("region_names", &regions.keys().collect::<Vec<_>>())
            .finish()
    }
}
