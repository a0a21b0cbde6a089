//! Configuration for the session store and cache regions.
//!
//! Everything has a sensible default; `Config::from_env` overrides from
//! `MNEMOSYNE_*` environment variables.

use std::env;
use std::time::Duration;

use crate::store;

/// Default store TTL for cache region entries, in seconds.
pub const DEFAULT_CACHE_EXPIRE_SECS: u32 = 1800;

/// Default key prefix for cache regions.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "auth:cache:";

/// Default key prefix for persisted sessions.
pub const DEFAULT_SESSION_KEY_PREFIX: &str = "auth:session:";

/// Default freshness window for the per-request session overlay.
pub const DEFAULT_OVERLAY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Store-level TTL applied to cache region entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTtl {
    /// Expire after the given number of seconds.
    Seconds(u32),
    /// Entries never expire on the store side.
    Never,
}

impl EntryTtl {
    /// Convert to the raw TTL value used at the store boundary.
    pub fn as_store_ttl(self) -> i64 {
        match self {
            Self::Seconds(secs) => i64::from(secs),
            Self::Never => store::NO_EXPIRE,
        }
    }
}

impl Default for EntryTtl {
    fn default() -> Self {
        Self::Seconds(DEFAULT_CACHE_EXPIRE_SECS)
    }
}

/// How the store-level TTL for a persisted session is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionExpiry {
    /// Derive the store TTL from the session's own logical timeout.
    #[default]
    MatchTimeout,
    /// Sessions never expire on the store side.
    Never,
    /// Use a fixed store TTL in seconds, regardless of the session timeout.
    ///
    /// A fixed TTL smaller than a session's logical timeout is allowed but
    /// flagged with a warning: the store may evict the session before it
    /// logically times out.
    Fixed(u32),
}

/// Configuration for one cache region.
#[derive(Debug, Clone)]
pub struct CacheRegionConfig {
    /// Key namespace prefix for this region.
    pub key_prefix: String,

    /// Store TTL applied to every entry (fixed per region, not per entry).
    pub ttl: EntryTtl,
}

impl Default for CacheRegionConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            ttl: EntryTtl::default(),
        }
    }
}

impl CacheRegionConfig {
    /// Create a config with the given key prefix and default TTL.
    pub fn with_prefix(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Default::default()
        }
    }

    /// Set the entry TTL (builder pattern).
    #[must_use]
    pub fn ttl(mut self, ttl: EntryTtl) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Configuration for the session store and its read overlay.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Key namespace prefix for persisted sessions.
    pub key_prefix: String,

    /// Store-level expiry policy for persisted sessions.
    pub expiry: SessionExpiry,

    /// Whether the per-request read overlay is consulted at all.
    pub overlay_enabled: bool,

    /// Age past which an overlay entry is treated as absent.
    pub overlay_timeout: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_SESSION_KEY_PREFIX.to_string(),
            expiry: SessionExpiry::default(),
            overlay_enabled: true,
            overlay_timeout: DEFAULT_OVERLAY_TIMEOUT,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Session store configuration.
    pub session: SessionStoreConfig,

    /// Authentication-result cache region.
    pub authc_cache: CacheRegionConfig,

    /// Authorization-result cache region.
    pub authz_cache: CacheRegionConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(prefix) = env::var("MNEMOSYNE_SESSION_KEY_PREFIX") {
            config.session.key_prefix = prefix;
        }
        config.session.expiry = parse_session_expiry(env::var("MNEMOSYNE_SESSION_EXPIRE").ok());
        if let Some(enabled) = env::var("MNEMOSYNE_OVERLAY_ENABLED")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            config.session.overlay_enabled = enabled;
        }
        if let Some(millis) = env::var("MNEMOSYNE_OVERLAY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.session.overlay_timeout = Duration::from_millis(millis);
        }

        config.authc_cache = region_from_env("MNEMOSYNE_AUTHC", "auth:authc:");
        config.authz_cache = region_from_env("MNEMOSYNE_AUTHZ", "auth:authz:");

        config
    }
}

fn region_from_env(var_prefix: &str, default_key_prefix: &str) -> CacheRegionConfig {
    let key_prefix = env::var(format!("{var_prefix}_KEY_PREFIX"))
        .unwrap_or_else(|_| default_key_prefix.to_string());
    let ttl = parse_entry_ttl(env::var(format!("{var_prefix}_EXPIRE")).ok());
    CacheRegionConfig { key_prefix, ttl }
}

fn parse_entry_ttl(value: Option<String>) -> EntryTtl {
    match value.and_then(|v| v.parse::<i64>().ok()) {
        Some(store::NO_EXPIRE) => EntryTtl::Never,
        // Out-of-range values fall back to the default like any other
        // unparseable input.
        Some(secs) => match u32::try_from(secs) {
            Ok(secs) if secs > 0 => EntryTtl::Seconds(secs),
            _ => EntryTtl::default(),
        },
        None => EntryTtl::default(),
    }
}

fn parse_session_expiry(value: Option<String>) -> SessionExpiry {
    match value.as_deref() {
        Some("never") => SessionExpiry::Never,
        Some(raw) => match raw.parse::<i64>() {
            Ok(store::NO_EXPIRE) => SessionExpiry::Never,
            Ok(secs) => match u32::try_from(secs) {
                Ok(secs) if secs > 0 => SessionExpiry::Fixed(secs),
                _ => SessionExpiry::MatchTimeout,
            },
            Err(_) => SessionExpiry::MatchTimeout,
        },
        None => SessionExpiry::MatchTimeout,
    }
}
