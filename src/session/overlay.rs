//! Per-request session read overlay.
//!
//! One logical request (a login or an authorization check) reads the same
//! session several times. The overlay serves those repeat reads without
//! extra store round trips. It is a deliberate, bounded staleness
//! mechanism: entries expire `overlay_timeout` after insertion, and an
//! overlay is created per request context, never shared between requests.

use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::config::SessionStoreConfig;
use crate::session::Session;

const OVERLAY_CAPACITY: u64 = 256;

/// Short-TTL read cache for sessions within one request context.
///
/// Cloning shares the same underlying slots; hand a clone down the call
/// chain of a single request rather than storing one globally.
#[derive(Clone)]
pub struct SessionOverlay {
    slots: Option<Cache<String, Session>>,
}

impl SessionOverlay {
    /// Create an overlay whose entries go stale after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let slots = Cache::builder()
            .max_capacity(OVERLAY_CAPACITY)
            .time_to_live(timeout)
            .build();
        Self { slots: Some(slots) }
    }

    /// Create a disabled overlay: answers nothing, stores nothing.
    pub fn disabled() -> Self {
        Self { slots: None }
    }

    /// Create an overlay according to the session store configuration.
    pub fn for_config(config: &SessionStoreConfig) -> Self {
        if config.overlay_enabled {
            Self::new(config.overlay_timeout)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.slots.is_some()
    }

    /// A fresh snapshot for `id`, if one was inserted within the window.
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.slots.as_ref()?.get(id);
        if session.is_some() {
            debug!(id, "session served from overlay");
        }
        session
    }

    /// Store a snapshot for `id`, replacing any previous one.
    pub fn insert(&self, id: &str, session: Session) {
        if let Some(slots) = &self.slots {
            slots.insert(id.to_string(), session);
        }
    }

    /// Drop the snapshot for `id`, if present.
    pub fn remove(&self, id: &str) {
        if let Some(slots) = &self.slots {
            slots.invalidate(id);
        }
    }
}

impl std::fmt::Debug for SessionOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOverlay")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_fresh_entries() {
        let overlay = SessionOverlay::new(Duration::from_secs(1));
        overlay.insert("s1", Session::with_id("s1", 60_000));
        assert_eq!(overlay.get("s1").unwrap().id(), Some("s1"));
    }

    #[test]
    fn stale_entries_are_absent() {
        let overlay = SessionOverlay::new(Duration::from_millis(30));
        overlay.insert("s1", Session::with_id("s1", 60_000));
        std::thread::sleep(Duration::from_millis(60));
        assert!(overlay.get("s1").is_none());
    }

    #[test]
    fn disabled_overlay_stores_nothing() {
        let overlay = SessionOverlay::disabled();
        overlay.insert("s1", Session::with_id("s1", 60_000));
        assert!(overlay.get("s1").is_none());
        assert!(!overlay.is_enabled());
    }

    #[test]
    fn remove_drops_the_snapshot() {
        let overlay = SessionOverlay::new(Duration::from_secs(1));
        overlay.insert("s1", Session::with_id("s1", 60_000));
        overlay.remove("s1");
        assert!(overlay.get("s1").is_none());
    }
}
