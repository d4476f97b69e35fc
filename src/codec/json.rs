//! JSON codec using `serde_json`.

use crate::error::{EncodeError, ParseError};

/// JSON codec for message bodies.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] if the bytes are not valid JSON for `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::malformed(e, bytes))
    }
}
