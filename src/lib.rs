//! Mnemosyne - tiered session store and authentication cache.
//!
//! Persists login sessions and caches authentication/authorization
//! decisions in a remote key-value store, with a short-lived per-request
//! read overlay that collapses repeated session reads within one logical
//! operation.
//!
//! ## Architecture
//!
//! - `config` - configuration with environment overrides
//! - `codec` - pluggable key/value serialization
//! - `store` - the remote store boundary, in-memory backend, timeout decorator
//! - `keys` - credential types and cache-key derivation
//! - `session` - sessions, the read overlay, and the session store
//! - `cache` - named cache regions and their registry
//! - `invalidate` - best-effort invalidation on logout/revocation
//!
//! Writes are always write-through: nothing is considered done until the
//! remote store accepted it. The overlay is a read shortcut with a
//! bounded staleness window, never a write buffer.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod invalidate;
pub mod keys;
pub mod session;
pub mod store;

pub use cache::{CacheRegion, CacheRegistry};
pub use codec::{JsonValueCodec, KeyCodec, Utf8KeyCodec, ValueCodec};
pub use config::{CacheRegionConfig, Config, EntryTtl, SessionExpiry, SessionStoreConfig};
pub use error::{Error, Result};
pub use invalidate::{InvalidationCoordinator, RegionInvalidate};
pub use keys::{AuthToken, DisplayKey, HasIdentifier, IdentifierKey, KeyDeriver, Principal};
pub use session::{Session, SessionOverlay, SessionStore};
pub use store::{MemoryStore, RemoteStore, TimedStore};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    /// Install the test subscriber once; `RUST_LOG` controls verbosity.
    pub(crate) fn init_tracing() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_test_writer()
                .try_init()
                .ok();
        });
    }
}
