//! Error types for hubwire.
//!
//! Each failure class of the protocol layer has its own type so callers can
//! tell a programming defect (building an invalid message) apart from a bad
//! peer (unparseable bytes) or an unrepresentable outbound payload.

use thiserror::Error;

use crate::message::MessageType;

/// Longest raw fragment carried in a [`ParseError::Malformed`] for logging.
const MAX_FRAGMENT_LEN: usize = 128;

/// Main error type for all hubwire operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// A message was built with a field combination its variant forbids.
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Received bytes did not form a valid message.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An outbound message could not be represented on the wire.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A wire value could not be coerced into the requested type.
    #[error("Convert error: {0}")]
    Convert(#[from] ConvertError),
}

/// Invalid field combination for a message variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// Completion with both an error and a result.
    #[error("completion for invocation {invocation_id} carries both an error and a result")]
    CompletionErrorAndResult {
        /// Invocation the completion belongs to.
        invocation_id: String,
    },

    /// Completion with a result value but `has_result` unset.
    #[error("completion for invocation {invocation_id} carries a result but has_result is false")]
    CompletionResultWithoutFlag {
        /// Invocation the completion belongs to.
        invocation_id: String,
    },
}

/// A complete unit on the wire was structurally invalid.
///
/// An incomplete trailing message is never a `ParseError`; see
/// [`ParsedMessages::is_incomplete`](crate::protocol::ParsedMessages::is_incomplete).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Frame bytes are not a valid document in the wire format.
    #[error("malformed message: {reason} (fragment: {fragment:?})")]
    Malformed {
        /// Decoder error text.
        reason: String,
        /// Leading bytes of the offending frame, lossily decoded.
        fragment: String,
    },

    /// A field the message type requires is absent.
    #[error("{message_type:?} message is missing required field '{field}'")]
    MissingField {
        /// Type of the message being decoded.
        message_type: MessageType,
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// A field is present but holds the wrong kind of value.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The `type` tag is outside the known message types.
    #[error("unknown message type {0}")]
    UnknownMessageType(u64),

    /// Frame length exceeds the configured maximum.
    #[error("message size {size} exceeds maximum {max}")]
    MessageTooLarge {
        /// Declared or observed frame size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Binary length prefix cannot be decoded; frame boundaries are lost.
    #[error("invalid length prefix: {0}")]
    InvalidLengthPrefix(String),

    /// A frame with no body.
    #[error("empty message frame")]
    EmptyFrame,
}

impl ParseError {
    /// Build a [`ParseError::Malformed`] from a decoder error and the raw frame.
    pub fn malformed(reason: impl ToString, raw: &[u8]) -> Self {
        let end = raw.len().min(MAX_FRAGMENT_LEN);
        Self::Malformed {
            reason: reason.to_string(),
            fragment: String::from_utf8_lossy(&raw[..end]).into_owned(),
        }
    }
}

/// An outbound message could not be encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// An opaque payload could not be turned into the intermediate tree.
    #[error("payload is not representable: {0}")]
    Payload(#[source] serde_json::Error),

    /// JSON serialization failed.
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack serialization failed.
    #[error("MsgPack encode error: {0}")]
    MsgPack(#[from] rmp_serde::encode::Error),

    /// Encoded message exceeds the configured maximum.
    #[error("encoded message size {size} exceeds maximum {max}")]
    MessageTooLarge {
        /// Encoded size including framing.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}

/// A wire value could not be converted to the caller's type.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Value shape does not match the target type.
    #[error("cannot convert {type_name}: {source}")]
    Mismatch {
        /// Requested Rust type.
        type_name: &'static str,
        /// Underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The converter refused the value before deserialization.
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Result type alias using HubError.
pub type Result<T> = std::result::Result<T, HubError>;
