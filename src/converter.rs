//! Coercion of wire values into caller types.
//!
//! Protocols decode payloads into `serde_json::Value`. A [`TypeConverter`]
//! turns such a value into whatever static type the caller asks for, at
//! the moment the caller asks.
//!
//! # Example
//!
//! ```
//! use hubwire::converter::{SerdeTypeConverter, TypeConverter};
//! use serde_json::json;
//!
//! let converter: &dyn TypeConverter = &SerdeTypeConverter;
//! let n: i64 = converter.convert(&json!(42)).unwrap();
//! assert_eq!(n, 42);
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConvertError;
use crate::message::Payload;

/// Converts intermediate wire values into caller-selected types.
pub trait TypeConverter: fmt::Debug + Send + Sync {
    /// Reshape a wire value into the form serde expects for the target type.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Unsupported`] if the value cannot be offered
    /// to any target type.
    fn prepare(&self, value: &Value) -> Result<Value, ConvertError>;
}

impl dyn TypeConverter + '_ {
    /// Convert a wire value into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Mismatch`] if the value does not fit `T`.
    pub fn convert<T: DeserializeOwned>(&self, value: &Value) -> Result<T, ConvertError> {
        let prepared = self.prepare(value)?;
        serde_json::from_value(prepared).map_err(|source| ConvertError::Mismatch {
            type_name: std::any::type_name::<T>(),
            source,
        })
    }

    /// Convert a payload into `T`, encoding it first if it is still deferred.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Unsupported`] if a deferred payload cannot be
    /// encoded, or [`ConvertError::Mismatch`] if it does not fit `T`.
    pub fn convert_payload<T: DeserializeOwned>(
        &self,
        payload: &Payload,
    ) -> Result<T, ConvertError> {
        let value = payload
            .to_wire_value()
            .map_err(|e| ConvertError::Unsupported(e.to_string()))?;
        self.convert(&value)
    }
}

/// Converter that hands the wire value to serde unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeTypeConverter;

impl TypeConverter for SerdeTypeConverter {
    #[inline]
    fn prepare(&self, value: &Value) -> Result<Value, ConvertError> {
        Ok(value.clone())
    }
}
