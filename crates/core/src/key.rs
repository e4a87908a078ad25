//! Key extraction: element -> (key, payload)
//!
//! The payload is always the element's canonical serialization (JSON). The
//! key decides identity: by default it is the payload itself, so two
//! elements are the same exactly when they serialize identically. A custom
//! key function lets elements with mutable attributes dedup by a stable
//! identity instead.
//!
//! Maps and sets with unspecified iteration order (e.g. `HashMap`) do not
//! serialize canonically; use ordered containers in elements, or a custom
//! key function that ignores them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A stored key function: derives the identity bytes of an element
pub type KeyFn<T> = Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>;

/// The (key, payload) pair derived from one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// `None` when the key is the payload
    key: Option<Vec<u8>>,
    payload: Vec<u8>,
}

impl Encoded {
    /// Identity bytes used for dedup and conflict matching
    #[inline]
    pub fn key(&self) -> &[u8] {
        self.key.as_deref().unwrap_or(&self.payload)
    }

    /// Canonical serialization of the element
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Strategy mapping elements of `T` to their (key, payload) bytes
///
/// Held once per store and applied to every set it manages.
pub struct KeyExtractor<T> {
    key_fn: Option<KeyFn<T>>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> KeyExtractor<T> {
    /// Identity by full structural equality: key = payload
    pub fn identity() -> Self {
        Self {
            key_fn: None,
            _marker: PhantomData,
        }
    }

    /// Identity by `key_fn`; the payload is still the full serialization
    pub fn with_key_fn<F>(key_fn: F) -> Self
    where
        F: Fn(&T) -> Vec<u8> + Send + Sync + 'static,
    {
        Self {
            key_fn: Some(Arc::new(key_fn)),
            _marker: PhantomData,
        }
    }

    /// Whether elements are identified by their full serialization, with
    /// no custom key function installed
    pub fn is_identity(&self) -> bool {
        self.key_fn.is_none()
    }
}

impl<T: Serialize> KeyExtractor<T> {
    /// Derive the (key, payload) pair of `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if the element cannot be serialized.
    pub fn extract(&self, value: &T) -> Result<Encoded> {
        let payload = encode(value)?;
        let key = self.key_fn.as_ref().map(|f| f(value));
        Ok(Encoded { key, payload })
    }

    /// Derive only the key of `value`
    pub fn key_of(&self, value: &T) -> Result<Vec<u8>> {
        match &self.key_fn {
            Some(f) => Ok(f(value)),
            None => encode(value),
        }
    }
}

impl<T> Clone for KeyExtractor<T> {
    fn clone(&self) -> Self {
        Self {
            key_fn: self.key_fn.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for KeyExtractor<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T> fmt::Debug for KeyExtractor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExtractor")
            .field("custom_key", &self.key_fn.is_some())
            .finish()
    }
}

/// Canonical serialization of an element
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(Error::Encoding)
}

/// Inverse of [`encode`]
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(Error::Decoding)
}

/// Like [`decode`], but overwrites `place`
///
/// Types with in-place deserialization (`Vec`, `String`, derived structs of
/// them) keep their existing allocations. On error `place` may hold a
/// partially decoded value.
pub fn decode_into<T: DeserializeOwned>(bytes: &[u8], place: &mut T) -> Result<()> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    T::deserialize_in_place(&mut de, place).map_err(Error::Decoding)?;
    de.end().map_err(Error::Decoding)
}
