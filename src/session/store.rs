//! Session store: write-through CRUD over the remote store.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{JsonValueCodec, KeyCodec, Utf8KeyCodec, ValueCodec};
use crate::config::{SessionExpiry, SessionStoreConfig};
use crate::error::{Error, Result};
use crate::session::{Session, SessionOverlay};
use crate::store::{NO_EXPIRE, RemoteStore};

/// CRUD for [`Session`] entities, keyed by session id.
///
/// Every write goes through to the remote store before the call returns;
/// the per-request [`SessionOverlay`] is only ever a read shortcut.
pub struct SessionStore {
    config: SessionStoreConfig,
    store: Arc<dyn RemoteStore>,
    key_codec: Arc<dyn KeyCodec>,
    value_codec: Arc<dyn ValueCodec<Session>>,
}

impl SessionStore {
    /// Create a session store with the default UTF-8/JSON codecs.
    pub fn new(config: SessionStoreConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self::with_codecs(
            config,
            store,
            Arc::new(Utf8KeyCodec),
            Arc::new(JsonValueCodec::new()),
        )
    }

    /// Create a session store with caller-supplied codecs.
    pub fn with_codecs(
        config: SessionStoreConfig,
        store: Arc<dyn RemoteStore>,
        key_codec: Arc<dyn KeyCodec>,
        value_codec: Arc<dyn ValueCodec<Session>>,
    ) -> Self {
        Self {
            config,
            store,
            key_codec,
            value_codec,
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// Create a fresh overlay for one request context.
    pub fn overlay(&self) -> SessionOverlay {
        SessionOverlay::for_config(&self.config)
    }

    /// Persist a new session, generating an id if it has none.
    ///
    /// Returns the assigned id.
    pub async fn create(&self, session: &mut Session) -> Result<String> {
        let id = match session.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                session.assign_id(id.clone());
                id
            }
        };
        self.save(session).await?;
        Ok(id)
    }

    /// Read a session by id.
    ///
    /// Consults the overlay first; on an overlay miss, fetches from the
    /// store and repopulates the overlay. `Ok(None)` means expired or
    /// never existed; a corrupt stored entry surfaces as
    /// [`Error::Deserialize`], not as a miss.
    pub async fn read(&self, overlay: &SessionOverlay, id: &str) -> Result<Option<Session>> {
        if let Some(session) = overlay.get(id) {
            return Ok(Some(session));
        }

        debug!(id, "reading session from store");
        let raw_key = self.key_codec.encode(&self.session_key(id))?;
        let Some(raw_value) = self.store.get(&raw_key).await? else {
            return Ok(None);
        };
        let session = self.value_codec.decode(&raw_value)?;
        overlay.insert(id, session.clone());
        Ok(Some(session))
    }

    /// Re-persist an existing session and refresh the overlay entry.
    pub async fn update(&self, overlay: &SessionOverlay, session: &Session) -> Result<()> {
        let id = session.id().ok_or(Error::MissingSessionId)?;
        self.save(session).await?;
        overlay.insert(id, session.clone());
        Ok(())
    }

    /// Remove a session from the store and the overlay.
    ///
    /// Deleting an absent or id-less session is not an error.
    pub async fn delete(&self, overlay: &SessionOverlay, session: &Session) -> Result<()> {
        let Some(id) = session.id() else {
            warn!("delete called on a session with no id");
            return Ok(());
        };
        let raw_key = self.key_codec.encode(&self.session_key(id))?;
        self.store.delete(&raw_key).await?;
        overlay.remove(id);
        Ok(())
    }

    /// Best-effort listing of all live sessions under this store's prefix.
    ///
    /// Entries that vanish mid-scan or fail to decode are skipped and
    /// logged; a single corrupt session never aborts the listing.
    pub async fn list_active(&self) -> Result<Vec<Session>> {
        let prefix = self.key_codec.encode(&self.config.key_prefix)?;
        let raw_keys = self.store.scan_by_prefix(&prefix).await?;

        let mut sessions = Vec::with_capacity(raw_keys.len());
        for raw_key in raw_keys {
            let raw_value = match self.store.get(&raw_key).await {
                Ok(Some(raw_value)) => raw_value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = ?String::from_utf8_lossy(&raw_key), error = %e, "skipping unreadable session");
                    continue;
                }
            };
            match self.value_codec.decode(&raw_value) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    warn!(key = ?String::from_utf8_lossy(&raw_key), error = %e, "skipping corrupt session");
                }
            }
        }
        Ok(sessions)
    }

    /// Approximate number of entries in the whole backing store.
    pub async fn approximate_store_count(&self) -> Result<u64> {
        self.store.approximate_count().await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let id = session.id().ok_or(Error::MissingSessionId)?;
        let raw_key = self.key_codec.encode(&self.session_key(id))?;
        let raw_value = self.value_codec.encode(session)?;

        let decision = reconcile_store_ttl(self.config.expiry, session.timeout_millis);
        if decision.undercuts_timeout {
            warn!(
                store_ttl_secs = decision.ttl_seconds,
                session_timeout_millis = session.timeout_millis,
                "store ttl is less than the session timeout; the store may \
                 evict this session before it logically expires"
            );
        }

        self.store.put(&raw_key, &raw_value, decision.ttl_seconds).await
    }

    fn session_key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }
}

/// Outcome of reconciling the configured expiry with a session timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TtlDecision {
    ttl_seconds: i64,
    /// True when a fixed store TTL is shorter than the logical timeout.
    undercuts_timeout: bool,
}

fn reconcile_store_ttl(expiry: SessionExpiry, timeout_millis: u64) -> TtlDecision {
    match expiry {
        SessionExpiry::MatchTimeout => TtlDecision {
            ttl_seconds: (timeout_millis / 1000) as i64,
            undercuts_timeout: false,
        },
        SessionExpiry::Never => TtlDecision {
            ttl_seconds: NO_EXPIRE,
            undercuts_timeout: false,
        },
        SessionExpiry::Fixed(secs) => TtlDecision {
            ttl_seconds: i64::from(secs),
            undercuts_timeout: u128::from(secs) * 1000 < u128::from(timeout_millis),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::store::MemoryStore;

    fn store_with(config: SessionStoreConfig) -> (SessionStore, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(config, memory.clone());
        (sessions, memory)
    }

    #[tokio::test]
    async fn create_assigns_an_id_and_writes_through() {
        let (sessions, _) = store_with(SessionStoreConfig::default());
        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();
        assert_eq!(session.id(), Some(id.as_str()));

        // A fresh overlay stands in for a different thread: the read must
        // come from the store, not from any overlay state.
        let read = sessions
            .read(&SessionOverlay::disabled(), &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read, session);
    }

    #[tokio::test]
    async fn match_timeout_uses_session_timeout_as_store_ttl() {
        let (sessions, memory) = store_with(SessionStoreConfig::default());
        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();

        let raw_key = format!("auth:session:{id}").into_bytes();
        let ttl = memory.ttl_of(&raw_key).unwrap();
        assert!((1795..=1800).contains(&ttl), "ttl was {ttl}");
    }

    #[tokio::test]
    async fn never_expiry_stores_without_deadline() {
        let config = SessionStoreConfig {
            expiry: SessionExpiry::Never,
            ..Default::default()
        };
        let (sessions, memory) = store_with(config);
        let mut session = Session::new(60_000);
        let id = sessions.create(&mut session).await.unwrap();

        let raw_key = format!("auth:session:{id}").into_bytes();
        assert_eq!(memory.ttl_of(&raw_key), Some(NO_EXPIRE));
    }

    #[test]
    fn fixed_ttl_below_timeout_is_flagged() {
        let decision = reconcile_store_ttl(SessionExpiry::Fixed(600), 1_800_000);
        assert_eq!(decision.ttl_seconds, 600);
        assert!(decision.undercuts_timeout);

        let decision = reconcile_store_ttl(SessionExpiry::Fixed(3600), 1_800_000);
        assert!(!decision.undercuts_timeout);

        let decision = reconcile_store_ttl(SessionExpiry::MatchTimeout, 1_800_000);
        assert_eq!(decision.ttl_seconds, 1800);
        assert!(!decision.undercuts_timeout);
    }

    #[tokio::test]
    async fn fixed_ttl_still_writes() {
        crate::test_support::init_tracing();
        let config = SessionStoreConfig {
            expiry: SessionExpiry::Fixed(600),
            ..Default::default()
        };
        let (sessions, _) = store_with(config);
        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();
        assert!(
            sessions
                .read(&SessionOverlay::disabled(), &id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn overlay_serves_repeat_reads_within_the_window() {
        let config = SessionStoreConfig {
            overlay_timeout: Duration::from_millis(80),
            ..Default::default()
        };
        let (sessions, _memory) = store_with(config);

        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();

        let overlay = sessions.overlay();
        let first = sessions.read(&overlay, &id).await.unwrap().unwrap();
        assert_eq!(first.attribute("role"), None);

        // Another writer changes the stored session behind our back.
        let mut changed = first.clone();
        changed.set_attribute("role", serde_json::json!("admin"));
        sessions
            .update(&SessionOverlay::disabled(), &changed)
            .await
            .unwrap();

        // Within the window the stale overlay snapshot is still served.
        let second = sessions.read(&overlay, &id).await.unwrap().unwrap();
        assert_eq!(second.attribute("role"), None);

        // Past the window the overlay entry is evicted and the store wins.
        tokio::time::sleep(Duration::from_millis(120)).await;
        let third = sessions.read(&overlay, &id).await.unwrap().unwrap();
        assert_eq!(third.attribute("role"), Some(&serde_json::json!("admin")));
    }

    #[tokio::test]
    async fn update_refreshes_the_overlay_entry() {
        let (sessions, _) = store_with(SessionStoreConfig::default());
        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();

        let overlay = sessions.overlay();
        sessions.read(&overlay, &id).await.unwrap();

        session.set_attribute("step", serde_json::json!(2));
        sessions.update(&overlay, &session).await.unwrap();

        let read = sessions.read(&overlay, &id).await.unwrap().unwrap();
        assert_eq!(read.attribute("step"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn delete_removes_store_entry_and_overlay_snapshot() {
        let (sessions, _) = store_with(SessionStoreConfig::default());
        let mut session = Session::new(1_800_000);
        let id = sessions.create(&mut session).await.unwrap();

        let overlay = sessions.overlay();
        sessions.read(&overlay, &id).await.unwrap();

        sessions.delete(&overlay, &session).await.unwrap();
        assert!(sessions.read(&overlay, &id).await.unwrap().is_none());

        // Deleting again, or deleting an id-less session, is fine.
        sessions.delete(&overlay, &session).await.unwrap();
        sessions
            .delete(&overlay, &Session::new(60_000))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_without_id_fails() {
        let (sessions, _) = store_with(SessionStoreConfig::default());
        let err = sessions
            .update(&SessionOverlay::disabled(), &Session::new(60_000))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingSessionId));
    }

    #[tokio::test]
    async fn corrupt_stored_session_surfaces_as_deserialize_error() {
        let (sessions, memory) = store_with(SessionStoreConfig::default());
        memory
            .put(b"auth:session:bad", b"not json", 60)
            .await
            .unwrap();

        let err = sessions
            .read(&SessionOverlay::disabled(), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[tokio::test]
    async fn list_active_skips_corrupt_entries() {
        crate::test_support::init_tracing();
        let (sessions, memory) = store_with(SessionStoreConfig::default());
        let mut session = Session::new(1_800_000);
        sessions.create(&mut session).await.unwrap();
        memory
            .put(b"auth:session:corrupt", b"garbage", 60)
            .await
            .unwrap();
        memory.put(b"unrelated:key", b"{}", 60).await.unwrap();

        let active = sessions.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), session.id());
        assert_eq!(sessions.approximate_store_count().await.unwrap(), 3);
    }
}
