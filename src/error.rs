//! Error types for session and cache operations.

/// Boxed cause carried by codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for all session store and cache region operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value or key could not be serialized.
    #[error("serialization failed: {0}")]
    Serialize(#[source] BoxError),

    /// Bytes exist in the store but could not be decoded.
    ///
    /// A corrupted entry is a distinct condition from "not present";
    /// read paths surface this instead of treating it as a miss.
    #[error("deserialization failed: {0}")]
    Deserialize(#[source] BoxError),

    /// The remote store call failed (network error or timeout).
    ///
    /// Never retried internally; the caller decides whether to fail the
    /// request or degrade.
    #[error("remote store unavailable: {0}")]
    StoreUnavailable(String),

    /// A key-derivation strategy could not produce a key from its input.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// An empty or blank region name was passed to the registry.
    #[error("cache region name cannot be empty")]
    InvalidRegionName,

    /// `update`/`delete` was called on a session with no assigned id.
    #[error("session has no assigned id")]
    MissingSessionId,
}

/// Result type for session store and cache region operations.
pub type Result<T> = std::result::Result<T, Error>;
