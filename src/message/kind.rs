//! Message type tags.
//!
//! The numeric tags are part of the interop contract:
//! ```text
//! 1 Invocation        5 CancelInvocation
//! 2 StreamItem        6 Ping
//! 3 Completion        7 Close
//! 4 StreamInvocation
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Closed set of hub message kinds with their wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessageType {
    /// Call to a named method.
    Invocation = 1,
    /// One item of a streamed result.
    StreamItem = 2,
    /// Terminal response to an invocation.
    Completion = 3,
    /// Call whose result is a stream of items.
    StreamInvocation = 4,
    /// Cancel a running stream invocation.
    CancelInvocation = 5,
    /// Keep-alive.
    Ping = 6,
    /// Connection close notice.
    Close = 7,
}

impl MessageType {
    /// Wire tag of this type.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value.tag()
    }
}

impl TryFrom<u64> for MessageType {
    type Error = ParseError;

    fn try_from(value: u64) -> Result<Self, ParseError> {
        match value {
            1 => Ok(Self::Invocation),
            2 => Ok(Self::StreamItem),
            3 => Ok(Self::Completion),
            4 => Ok(Self::StreamInvocation),
            5 => Ok(Self::CancelInvocation),
            6 => Ok(Self::Ping),
            7 => Ok(Self::Close),
            other => Err(ParseError::UnknownMessageType(other)),
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, ParseError> {
        Self::try_from(u64::from(value))
    }
}
