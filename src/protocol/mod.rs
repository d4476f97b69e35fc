//! Protocol module - hub protocols and framing.
//!
//! A [`HubProtocol`] converts between raw bytes and [`HubMessage`] values.
//! Protocols are stateless: `parse_messages` is a pure function from the
//! bytes available now to the complete messages they contain plus the
//! number of bytes consumed. Keeping the unconsumed tail for the next read
//! belongs to the transport (see [`MessageBuffer`](crate::MessageBuffer)
//! for a ready-made helper).
//!
//! - [`JsonHubProtocol`] - `"json"`, text, record-separator framing
//! - [`MessagePackHubProtocol`] - `"messagepack"`, binary, varint framing
//!
//! # Example
//!
//! ```
//! use hubwire::protocol::{HubProtocol, JsonHubProtocol};
//! use hubwire::{CompletionMessage, HubMessage};
//!
//! let protocol = JsonHubProtocol::new();
//! let bytes = protocol
//!     .write_message(&CompletionMessage::with_error("7", "boom").into())
//!     .unwrap();
//!
//! let parsed = protocol.parse_messages(&bytes).into_messages().unwrap();
//! assert_eq!(parsed, vec![HubMessage::from(CompletionMessage::with_error("7", "boom"))]);
//! ```

mod framing;
mod json;
mod msgpack;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::converter::TypeConverter;
use crate::error::{EncodeError, ParseError};
use crate::message::HubMessage;

pub use framing::{
    decode_length_prefix, encode_length_prefix, MAX_LENGTH_PREFIX_SIZE, MAX_PREFIXED_LENGTH,
    RECORD_SEPARATOR,
};
pub use json::{JsonHubProtocol, JSON_PROTOCOL_NAME, JSON_PROTOCOL_VERSION};
pub use msgpack::{MessagePackHubProtocol, MSGPACK_PROTOCOL_NAME, MSGPACK_PROTOCOL_VERSION};

/// Whether a protocol's wire representation is text or binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    /// UTF-8 text, delimiter framed.
    Text = 1,
    /// Arbitrary bytes, length framed.
    Binary = 2,
}

/// A named, versioned wire format for hub messages.
pub trait HubProtocol: Send + Sync {
    /// Name used during handshake negotiation.
    fn name(&self) -> &str;

    /// Version used during handshake negotiation.
    fn version(&self) -> u32;

    /// Text or binary.
    fn protocol_type(&self) -> ProtocolType;

    /// Converter for payloads this protocol decodes.
    fn type_converter(&self) -> &dyn TypeConverter;

    /// Extract every complete message from `input`, in wire order.
    ///
    /// A trailing partial message is not consumed and is not an error.
    fn parse_messages(&self, input: &[u8]) -> ParsedMessages;

    /// Serialize one message, framing included.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a payload is not representable in this
    /// format or the result exceeds the configured size.
    fn write_message(&self, message: &HubMessage) -> Result<Bytes, EncodeError>;
}

impl<P: HubProtocol + ?Sized> HubProtocol for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> u32 {
        (**self).version()
    }

    fn protocol_type(&self) -> ProtocolType {
        (**self).protocol_type()
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        (**self).type_converter()
    }

    fn parse_messages(&self, input: &[u8]) -> ParsedMessages {
        (**self).parse_messages(input)
    }

    fn write_message(&self, message: &HubMessage) -> Result<Bytes, EncodeError> {
        (**self).write_message(message)
    }
}

impl<P: HubProtocol + ?Sized> HubProtocol for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> u32 {
        (**self).version()
    }

    fn protocol_type(&self) -> ProtocolType {
        (**self).protocol_type()
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        (**self).type_converter()
    }

    fn parse_messages(&self, input: &[u8]) -> ParsedMessages {
        (**self).parse_messages(input)
    }

    fn write_message(&self, message: &HubMessage) -> Result<Bytes, EncodeError> {
        (**self).write_message(message)
    }
}

impl fmt::Debug for dyn HubProtocol + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubProtocol")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("type", &self.protocol_type())
            .finish()
    }
}

/// Result of [`HubProtocol::parse_messages`].
///
/// Each complete frame yields one item: the message, or the error that
/// frame produced. A bad frame does not stop later frames from parsing.
#[derive(Debug, Default)]
pub struct ParsedMessages {
    /// One entry per complete frame, in wire order.
    pub items: Vec<Result<HubMessage, ParseError>>,
    /// Bytes consumed from the start of the input.
    pub consumed: usize,
}

impl ParsedMessages {
    /// Whether `input_len` bytes left a partial message unconsumed.
    #[inline]
    pub fn is_incomplete(&self, input_len: usize) -> bool {
        self.consumed < input_len
    }

    /// The unconsumed tail of `input`.
    #[inline]
    pub fn remainder<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.consumed.min(input.len())..]
    }

    /// Successfully parsed messages, skipping failures.
    pub fn messages(&self) -> impl Iterator<Item = &HubMessage> {
        self.items.iter().filter_map(|item| item.as_ref().ok())
    }

    /// Failures, in wire order.
    pub fn errors(&self) -> impl Iterator<Item = &ParseError> {
        self.items.iter().filter_map(|item| item.as_ref().err())
    }

    /// Whether any frame failed to parse.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Result::is_err)
    }

    /// All messages, or the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] in wire order.
    pub fn into_messages(self) -> Result<Vec<HubMessage>, ParseError> {
        self.items.into_iter().collect()
    }
}
