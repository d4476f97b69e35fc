//! Type-erased payload values.
//!
//! Arguments, stream items and completion results have no static type inside
//! the message model. Outbound values are held behind [`Encodable`] and only
//! turned into the intermediate tree (`serde_json::Value`) when a protocol
//! writes the message. Inbound values arrive as that tree already and are
//! coerced later by a [`TypeConverter`](crate::converter::TypeConverter).
//!
//! # Example
//!
//! ```
//! use hubwire::Payload;
//! use serde_json::json;
//!
//! let outbound = Payload::encodable(vec![1, 2, 3]);
//! let inbound = Payload::from(json!([1, 2, 3]));
//! assert_eq!(outbound, inbound);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::EncodeError;

/// Capability to serialize into the intermediate wire tree without the
/// caller knowing the concrete type.
pub trait Encodable: fmt::Debug + Send + Sync {
    /// Convert into the intermediate tree.
    fn to_wire_value(&self) -> Result<Value, EncodeError>;
}

impl<T> Encodable for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_wire_value(&self) -> Result<Value, EncodeError> {
        serde_json::to_value(self).map_err(EncodeError::Payload)
    }
}

/// An opaque argument, item or result value.
#[derive(Clone)]
pub enum Payload {
    /// Value already in the intermediate tree (parsed from the wire).
    Value(Value),
    /// Value encoded on demand at write time.
    Deferred(Arc<dyn Encodable>),
}

impl Payload {
    /// Wrap any serializable value for deferred encoding.
    pub fn encodable<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(value))
    }

    /// Null payload.
    #[inline]
    pub const fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// The intermediate tree for this payload.
    ///
    /// Borrowed for parsed values, freshly encoded for deferred ones.
    pub fn to_wire_value(&self) -> Result<Cow<'_, Value>, EncodeError> {
        match self {
            Self::Value(value) => Ok(Cow::Borrowed(value)),
            Self::Deferred(encodable) => encodable.to_wire_value().map(Cow::Owned),
        }
    }

    /// The parsed tree, if this payload came off the wire.
    #[inline]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Whether encoding is still pending.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Arc<dyn Encodable>> for Payload {
    fn from(value: Arc<dyn Encodable>) -> Self {
        Self::Deferred(value)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::null()
    }
}

/// Payloads are equal when their intermediate trees are equal. A payload
/// that fails to encode equals nothing.
impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_wire_value(), other.to_wire_value()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Deferred(encodable) => f.debug_tuple("Deferred").field(encodable).finish(),
        }
    }
}

/// Collect serializable values into a `Vec<Payload>`.
///
/// ```
/// use hubwire::payloads;
///
/// let args = payloads!["hello", 42];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! payloads {
    () => {
        ::std::vec::Vec::<$crate::Payload>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Payload::encodable($value)),+]
    };
}
