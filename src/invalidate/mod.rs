//! Best-effort cache invalidation on logout and token revocation.
//!
//! Authentication results are cached keyed from the presented token;
//! authorization results are cached keyed from the resolved principal.
//! Because both derive the same key suffix (see [`crate::keys`]), the
//! coordinator can recompute the key from whichever credential shape is
//! available and clear both regions with it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::CacheRegion;
use crate::error::Result;
use crate::keys::HasIdentifier;

/// A cache region that can be invalidated by a pre-derived key.
#[async_trait]
pub trait RegionInvalidate: Send + Sync {
    fn name(&self) -> &str;

    /// Remove the entry stored under the derived logical key.
    async fn remove_derived(&self, derived: &str) -> Result<()>;
}

#[async_trait]
impl<K, V> RegionInvalidate for CacheRegion<K, V>
where
    K: Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        CacheRegion::name(self)
    }

    async fn remove_derived(&self, derived: &str) -> Result<()> {
        CacheRegion::remove_derived(self, derived).await
    }
}

/// Removes cached authentication/authorization state for a credential.
///
/// Everything here is best-effort cleanup: derivation or store failures
/// are logged and reported as `false`, never raised. A failed
/// invalidation must not block logout from completing.
pub struct InvalidationCoordinator {
    authc: Arc<dyn RegionInvalidate>,
    authz: Arc<dyn RegionInvalidate>,
}

impl InvalidationCoordinator {
    /// Create a coordinator over the authentication-result and
    /// authorization-result regions.
    pub fn new(authc: Arc<dyn RegionInvalidate>, authz: Arc<dyn RegionInvalidate>) -> Self {
        Self { authc, authz }
    }

    /// Invalidate cached entries for a presented token.
    ///
    /// Token-derived and principal-derived keys agree, so the token alone
    /// is enough to clear the authorization entry cached for whichever
    /// principal it authenticated to.
    ///
    /// Returns whether the removals were issued successfully.
    pub async fn invalidate_by_token(&self, token: &impl HasIdentifier) -> bool {
        let Some(derived) = self.derive(token) else {
            return false;
        };
        self.remove_both(&derived).await
    }

    /// Invalidate cached entries for a resolved principal.
    ///
    /// The two regions use different prefixes but agree on the derived
    /// key suffix, so one derivation serves both removals.
    pub async fn invalidate_by_principal(&self, principal: &impl HasIdentifier) -> bool {
        let Some(derived) = self.derive(principal) else {
            return false;
        };
        self.remove_both(&derived).await
    }

    async fn remove_both(&self, derived: &str) -> bool {
        let authc_ok = self.remove(&*self.authc, derived).await;
        let authz_ok = self.remove(&*self.authz, derived).await;
        authc_ok && authz_ok
    }

    fn derive(&self, credential: &impl HasIdentifier) -> Option<String> {
        match credential.identifier() {
            Some(id) if !id.is_empty() => Some(id),
            _ => {
                warn!("credential exposes no identifier; skipping invalidation");
                None
            }
        }
    }

    async fn remove(&self, region: &dyn RegionInvalidate, derived: &str) -> bool {
        match region.remove_derived(derived).await {
            Ok(()) => {
                debug!(region = region.name(), "invalidated cache entry");
                true
            }
            Err(e) => {
                warn!(region = region.name(), error = %e, "cache invalidation failed");
                false
            }
        }
    }
}
