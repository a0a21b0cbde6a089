//! Credential types and cache-key derivation.
//!
//! Authentication results are cached while only the presented token is
//! known; authorization results are cached after the principal has been
//! resolved. Both paths must agree on the derived key so a single
//! invalidation clears them together. `Principal` guarantees this by
//! deriving its identifier from the token it was resolved from.

use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A presented credential token, prior to authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Application the token was issued for.
    pub app: String,

    /// Token kind (e.g. "bearer", "api-key").
    pub kind: String,

    /// Device or channel the token was presented from.
    pub device: String,

    /// The opaque token value itself.
    pub value: String,
}

impl AuthToken {
    pub fn new(
        app: impl Into<String>,
        kind: impl Into<String>,
        device: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            kind: kind.into(),
            device: device.into(),
            value: value.into(),
        }
    }
}

/// An authenticated principal, resolved from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique user id within `user_app`.
    pub user_id: String,

    /// Application the user belongs to.
    pub user_app: String,

    /// The token this principal was resolved from.
    ///
    /// Carrying the token is what makes token-derived and
    /// principal-derived cache keys agree.
    pub token: AuthToken,

    /// Additional resolved attributes (display name, tenant, ...).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Principal {
    pub fn new(
        user_id: impl Into<String>,
        user_app: impl Into<String>,
        token: AuthToken,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_app: user_app.into(),
            token,
            attributes: HashMap::new(),
        }
    }
}

/// Capability exposing the unique identifier a cache key is derived from.
///
/// This is the statically-declared replacement for looking up an id getter
/// by naming convention at runtime: a type either declares its identifier
/// or it cannot be used as a derived cache key.
pub trait HasIdentifier {
    /// The identifier, or `None` when the value carries none.
    fn identifier(&self) -> Option<String>;
}

impl HasIdentifier for AuthToken {
    fn identifier(&self) -> Option<String> {
        if self.value.is_empty() {
            return None;
        }
        Some(format!(
            "{}:{}:{}:{}",
            self.app, self.kind, self.device, self.value
        ))
    }
}

impl HasIdentifier for Principal {
    fn identifier(&self) -> Option<String> {
        // Same key as the token the principal was resolved from.
        self.token.identifier()
    }
}

/// Converts a structured credential into the logical cache key string.
pub trait KeyDeriver<K>: Send + Sync {
    /// Derive the logical key, or fail with [`Error::KeyDerivation`].
    fn derive(&self, key: &K) -> Result<String>;
}

/// Derivation strategy for tokens and principals via [`HasIdentifier`].
pub struct IdentifierKey<K> {
    _marker: PhantomData<fn() -> K>,
}

impl<K> IdentifierKey<K> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K> Default for IdentifierKey<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HasIdentifier> KeyDeriver<K> for IdentifierKey<K> {
    fn derive(&self, key: &K) -> Result<String> {
        match key.identifier() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(Error::KeyDerivation(format!(
                "{} exposes no identifier",
                std::any::type_name::<K>()
            ))),
        }
    }
}

/// Identity strategy for plain displayable keys.
pub struct DisplayKey<K> {
    _marker: PhantomData<fn() -> K>,
}

impl<K> DisplayKey<K> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K> Default for DisplayKey<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Display + Send + Sync> KeyDeriver<K> for DisplayKey<K> {
    fn derive(&self, key: &K) -> Result<String> {
        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AuthToken {
        AuthToken::new("portal", "bearer", "web", "tok-123")
    }

    #[test]
    fn token_and_principal_derive_the_same_key() {
        let token = token();
        let principal = Principal::new("42", "portal", token.clone());

        let from_token = IdentifierKey::<AuthToken>::new().derive(&token).unwrap();
        let from_principal = IdentifierKey::<Principal>::new()
            .derive(&principal)
            .unwrap();

        assert_eq!(from_token, from_principal);
        assert_eq!(from_token, "portal:bearer:web:tok-123");
    }

    #[test]
    fn empty_token_value_fails_derivation() {
        let token = AuthToken::new("portal", "bearer", "web", "");
        let err = IdentifierKey::<AuthToken>::new().derive(&token).unwrap_err();
        assert!(matches!(err, Error::KeyDerivation(_)));

        let principal = Principal::new("42", "portal", token);
        let err = IdentifierKey::<Principal>::new()
            .derive(&principal)
            .unwrap_err();
        assert!(matches!(err, Error::KeyDerivation(_)));
    }

    #[test]
    fn display_key_passes_strings_through() {
        let derived = DisplayKey::<String>::new()
            .derive(&"user:42".to_string())
            .unwrap();
        assert_eq!(derived, "user:42");
    }
}
