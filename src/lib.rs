//! # hubwire
//!
//! Message model and wire protocols for a persistent bidirectional RPC
//! client talking to a remote hub.
//!
//! This crate sits between the transport (which moves bytes) and the
//! connection logic (which routes invocations and resolves completions).
//! It never performs I/O.
//!
//! ## Architecture
//!
//! - **Message model** ([`message`]): the closed set of [`HubMessage`]
//!   variants with type-erased [`Payload`] values
//! - **Protocols** ([`protocol`]): [`JsonHubProtocol`] (text) and
//!   [`MessagePackHubProtocol`] (binary) behind the [`HubProtocol`] trait
//! - **Type conversion** ([`converter`]): coerces decoded payloads into
//!   caller types on demand
//!
//! ## Example
//!
//! ```
//! use hubwire::{payloads, HubMessage, HubProtocol, InvocationMessage, JsonHubProtocol};
//!
//! let protocol = JsonHubProtocol::new();
//! let message: HubMessage = InvocationMessage::new("Send", payloads!["hello", 42])
//!     .with_invocation_id("1")
//!     .into();
//!
//! let bytes = protocol.write_message(&message).unwrap();
//! let parsed = protocol.parse_messages(&bytes).into_messages().unwrap();
//!
//! let HubMessage::Invocation(invocation) = &parsed[0] else { unreachable!() };
//! let converter = protocol.type_converter();
//! let text: String = converter.convert_payload(&invocation.arguments[0]).unwrap();
//! let number: i64 = converter.convert_payload(&invocation.arguments[1]).unwrap();
//! assert_eq!((text.as_str(), number), ("hello", 42));
//! ```

pub mod codec;
pub mod converter;
pub mod error;
pub mod message;
pub mod protocol;

mod buffer;
mod config;

pub use buffer::MessageBuffer;
pub use config::{ProtocolOptions, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::{ConstructionError, ConvertError, EncodeError, HubError, ParseError};
pub use message::{
    CancelInvocationMessage, CloseMessage, CompletionMessage, CompletionOutcome, Encodable,
    HubMessage, InvocationMessage, MessageType, Payload, StreamInvocationMessage,
    StreamItemMessage, PING,
};
pub use protocol::{
    HubProtocol, JsonHubProtocol, MessagePackHubProtocol, ParsedMessages, ProtocolType,
};
