//! Named cache regions over the remote store.
//!
//! A region is a prefix-namespaced cache inside the store:
//! - `CacheRegion` - typed get/put/remove plus best-effort bulk operations
//! - `CacheRegistry` - central registry holding at most one region per name
//!
//! Regions are created through the registry so that concurrent first
//! access for the same name always observes a single instance.

mod region;
mod registry;

pub use region::CacheRegion;
pub use registry::CacheRegistry;
