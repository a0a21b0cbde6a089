//! Sessions and the tiered session store.
//!
//! A [`Session`] is the server-side state for one authenticated
//! principal's interaction lifetime. Durable copies live in the remote
//! store; a short-lived [`SessionOverlay`] absorbs repeated reads of the
//! same session within one logical request.

mod overlay;
mod store;

pub use overlay::SessionOverlay;
pub use store::SessionStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier, assigned once at creation and immutable after.
    id: Option<String>,

    /// Application-defined logical lifetime in milliseconds.
    pub timeout_millis: u64,

    /// Last access time; monotonically non-decreasing for a single writer.
    pub last_access_time: DateTime<Utc>,

    /// Session attributes.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Opaque serialized payload owned by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Vec<u8>>,
}

impl Session {
    /// Create an unsaved session with the given logical timeout.
    pub fn new(timeout_millis: u64) -> Self {
        Self {
            id: None,
            timeout_millis,
            last_access_time: Utc::now(),
            attributes: HashMap::new(),
            blob: None,
        }
    }

    /// Create a session with a caller-supplied id.
    pub fn with_id(id: impl Into<String>, timeout_millis: u64) -> Self {
        let mut session = Self::new(timeout_millis);
        session.id = Some(id.into());
        session
    }

    /// The assigned id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Record an access now, keeping `last_access_time` non-decreasing.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.last_access_time {
            self.last_access_time = now;
        }
    }

    /// Read an attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Remove an attribute, returning the previous value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<serde_json::Value> {
        self.attributes.remove(key)
    }
}
