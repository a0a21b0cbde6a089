//! Pluggable key and value codecs.
//!
//! Logical keys are strings; values are arbitrary serde types. Both sides
//! of the store boundary go through these traits so callers can swap the
//! wire representation without touching the stores.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Serializes logical key strings to and from store bytes.
pub trait KeyCodec: Send + Sync {
    /// Encode a logical key into store bytes.
    fn encode(&self, key: &str) -> Result<Vec<u8>>;

    /// Decode store bytes back into a logical key.
    fn decode(&self, raw: &[u8]) -> Result<String>;
}

/// Serializes values of type `T` to and from store bytes.
pub trait ValueCodec<T>: Send + Sync {
    /// Encode a value into store bytes.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode store bytes back into a value.
    fn decode(&self, raw: &[u8]) -> Result<T>;
}

/// Key codec that stores keys as their UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8KeyCodec;

impl KeyCodec for Utf8KeyCodec {
    fn encode(&self, key: &str) -> Result<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }

    fn decode(&self, raw: &[u8]) -> Result<String> {
        String::from_utf8(raw.to_vec()).map_err(|e| Error::Deserialize(Box::new(e)))
    }
}

/// Value codec that stores values as JSON.
pub struct JsonValueCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonValueCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonValueCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueCodec<T> for JsonValueCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Serialize(Box::new(e)))
    }

    fn decode(&self, raw: &[u8]) -> Result<T> {
        serde_json::from_slice(raw).map_err(|e| Error::Deserialize(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_key_round_trip() {
        let codec = Utf8KeyCodec;
        let raw = codec.encode("auth:session:abc").unwrap();
        assert_eq!(codec.decode(&raw).unwrap(), "auth:session:abc");
    }

    #[test]
    fn utf8_key_rejects_invalid_bytes() {
        let codec = Utf8KeyCodec;
        let err = codec.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[test]
    fn json_value_round_trip() {
        let codec = JsonValueCodec::<Vec<String>>::new();
        let value = vec!["admin".to_string(), "editor".to_string()];
        let raw = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&raw).unwrap(), value);
    }

    #[test]
    fn json_decode_failure_is_deserialize_error() {
        let codec = JsonValueCodec::<Vec<String>>::new();
        let err = codec.decode(b"not json").unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }
}
