//! Hub message model.
//!
//! [`HubMessage`] is the closed set of messages exchanged with a hub. Every
//! variant is a plain immutable value; protocols in [`crate::protocol`]
//! turn them into bytes and back.
//!
//! # Example
//!
//! ```
//! use hubwire::{payloads, HubMessage, InvocationMessage, MessageType};
//!
//! let message: HubMessage = InvocationMessage::new("Send", payloads!["hello", 42])
//!     .with_invocation_id("1")
//!     .into();
//!
//! assert_eq!(message.message_type(), MessageType::Invocation);
//! assert_eq!(message.invocation_id(), Some("1"));
//! ```

mod completion;
mod kind;
mod payload;

pub use completion::{CompletionMessage, CompletionOutcome};
pub use kind::MessageType;
pub use payload::{Encodable, Payload};

/// Shared keep-alive message.
pub const PING: HubMessage = HubMessage::Ping;

/// A message exchanged with the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Call to a named method, in either direction.
    Invocation(InvocationMessage),
    /// One item of a stream.
    StreamItem(StreamItemMessage),
    /// Terminal response to an invocation.
    Completion(CompletionMessage),
    /// Call whose result is a stream.
    StreamInvocation(StreamInvocationMessage),
    /// Cancel a stream invocation.
    CancelInvocation(CancelInvocationMessage),
    /// Keep-alive, no payload.
    Ping,
    /// Connection close notice.
    Close(CloseMessage),
}

impl HubMessage {
    /// The shared ping value.
    #[inline]
    pub const fn ping() -> Self {
        PING
    }

    /// Wire type tag of this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Invocation(_) => MessageType::Invocation,
            Self::StreamItem(_) => MessageType::StreamItem,
            Self::Completion(_) => MessageType::Completion,
            Self::StreamInvocation(_) => MessageType::StreamInvocation,
            Self::CancelInvocation(_) => MessageType::CancelInvocation,
            Self::Ping => MessageType::Ping,
            Self::Close(_) => MessageType::Close,
        }
    }

    /// Invocation ID carried by this message, if any.
    pub fn invocation_id(&self) -> Option<&str> {
        match self {
            Self::Invocation(m) => m.invocation_id.as_deref(),
            Self::StreamItem(m) => Some(&m.invocation_id),
            Self::Completion(m) => Some(&m.invocation_id),
            Self::StreamInvocation(m) => Some(&m.invocation_id),
            Self::CancelInvocation(m) => Some(&m.invocation_id),
            Self::Ping | Self::Close(_) => None,
        }
    }
}

/// Call to a named method.
///
/// Without an invocation ID the call is fire-and-forget and no completion
/// will follow.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationMessage {
    /// Correlates the completion; `None` for fire-and-forget.
    pub invocation_id: Option<String>,
    /// Method name.
    pub target: String,
    /// Positional arguments.
    pub arguments: Vec<Payload>,
}

impl InvocationMessage {
    /// Fire-and-forget invocation.
    pub fn new(target: impl Into<String>, arguments: Vec<Payload>) -> Self {
        Self {
            invocation_id: None,
            target: target.into(),
            arguments,
        }
    }

    /// Attach an invocation ID so the hub answers with a completion.
    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }

    /// Whether no completion is expected.
    #[inline]
    pub fn is_fire_and_forget(&self) -> bool {
        self.invocation_id.is_none()
    }
}

/// Call whose result is delivered as stream items.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInvocationMessage {
    /// Addresses the resulting stream.
    pub invocation_id: String,
    /// Method name.
    pub target: String,
    /// Positional arguments.
    pub arguments: Vec<Payload>,
}

impl StreamInvocationMessage {
    /// Create a stream invocation.
    pub fn new(
        invocation_id: impl Into<String>,
        target: impl Into<String>,
        arguments: Vec<Payload>,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            target: target.into(),
            arguments,
        }
    }
}

/// One item of a streamed result.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamItemMessage {
    /// Stream this item belongs to.
    pub invocation_id: String,
    /// Item value.
    pub item: Payload,
}

impl StreamItemMessage {
    /// Create a stream item.
    pub fn new(invocation_id: impl Into<String>, item: impl Into<Payload>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            item: item.into(),
        }
    }
}

/// Cancel a prior stream invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelInvocationMessage {
    /// Stream to cancel.
    pub invocation_id: String,
}

impl CancelInvocationMessage {
    /// Create a cancel request.
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
        }
    }
}

/// Connection close notice. An error means the close was abnormal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseMessage {
    /// Reason for an abnormal close.
    pub error: Option<String>,
}

impl CloseMessage {
    /// Normal close.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abnormal close with a reason.
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}

impl From<InvocationMessage> for HubMessage {
    fn from(message: InvocationMessage) -> Self {
        Self::Invocation(message)
    }
}

impl From<StreamItemMessage> for HubMessage {
    fn from(message: StreamItemMessage) -> Self {
        Self::StreamItem(message)
    }
}

impl From<CompletionMessage> for HubMessage {
    fn from(message: CompletionMessage) -> Self {
        Self::Completion(message)
    }
}

impl From<StreamInvocationMessage> for HubMessage {
    fn from(message: StreamInvocationMessage) -> Self {
        Self::StreamInvocation(message)
    }
}

impl From<CancelInvocationMessage> for HubMessage {
    fn from(message: CancelInvocationMessage) -> Self {
        Self::CancelInvocation(message)
    }
}

impl From<CloseMessage> for HubMessage {
    fn from(message: CloseMessage) -> Self {
        Self::Close(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads;
    use serde_json::json;

    #[test]
    fn test_message_type_per_variant() {
        let cases: Vec<(HubMessage, MessageType)> = vec![
            (
                InvocationMessage::new("a", vec![]).into(),
                MessageType::Invocation,
            ),
            (
                StreamItemMessage::new("1", json!(1)).into(),
                MessageType::StreamItem,
            ),
            (CompletionMessage::void("1").into(), MessageType::Completion),
            (
                StreamInvocationMessage::new("1", "a", vec![]).into(),
                MessageType::StreamInvocation,
            ),
            (
                CancelInvocationMessage::new("1").into(),
                MessageType::CancelInvocation,
            ),
            (HubMessage::ping(), MessageType::Ping),
            (CloseMessage::new().into(), MessageType::Close),
        ];

        for (message, expected) in cases {
            assert_eq!(message.message_type(), expected);
        }
    }

    #[test]
    fn test_ping_is_shared_value() {
        let a = HubMessage::ping();
        let b = PING;
        assert_eq!(a, b);
        assert_eq!(a.message_type(), MessageType::Ping);
        assert!(a.invocation_id().is_none());
    }

    #[test]
    fn test_fire_and_forget_invocation() {
        let invocation = InvocationMessage::new("Notify", payloads!["x"]);
        assert!(invocation.is_fire_and_forget());

        let invocation = invocation.with_invocation_id("42");
        assert!(!invocation.is_fire_and_forget());
        assert_eq!(invocation.invocation_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_invocation_id_accessor() {
        let stream: HubMessage =
            StreamInvocationMessage::new("s1", "Counter", payloads![10]).into();
        assert_eq!(stream.invocation_id(), Some("s1"));

        let cancel: HubMessage = CancelInvocationMessage::new("s1").into();
        assert_eq!(cancel.invocation_id(), Some("s1"));

        let close: HubMessage = CloseMessage::with_error("bye").into();
        assert_eq!(close.invocation_id(), None);
    }

    #[test]
    fn test_outbound_equals_parsed_shape() {
        let outbound =
            InvocationMessage::new("Send", payloads!["hello", 42]).with_invocation_id("1");
        let parsed = InvocationMessage {
            invocation_id: Some("1".to_string()),
            target: "Send".to_string(),
            arguments: vec![json!("hello").into(), json!(42).into()],
        };
        assert_eq!(outbound, parsed);
    }

    #[test]
    fn test_close_error() {
        assert!(CloseMessage::new().error.is_none());
        assert_eq!(
            CloseMessage::with_error("server shutdown").error.as_deref(),
            Some("server shutdown")
        );
    }
}
