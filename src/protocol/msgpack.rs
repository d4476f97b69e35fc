//! MessagePack hub protocol.
//!
//! Every message is a MessagePack array behind a varint length prefix.
//! Positions, not names, identify fields:
//! ```text
//! Invocation        [1, headers, invocationId | nil, target, [arguments]]
//! StreamItem        [2, headers, invocationId, item]
//! Completion        [3, headers, invocationId, 1, error]
//!                   [3, headers, invocationId, 2]
//!                   [3, headers, invocationId, 3, result]
//! StreamInvocation  [4, headers, invocationId, target, [arguments]]
//! CancelInvocation  [5, headers, invocationId]
//! Ping              [6]
//! Close             [7, error | nil]
//! ```
//!
//! Headers are written as an empty map and ignored on read. Trailing
//! elements newer peers may append (stream IDs, a reconnect flag) are
//! ignored. Payload values with no JSON counterpart (`bin`, timestamps,
//! integer map keys) are mapped as described on
//! [`MsgPackCodec::decode_tree`].

use bytes::Bytes;
use serde_json::{Map, Value};

use super::framing::{
    encode_length_prefix, parse_frames, scan_binary_frame, MAX_LENGTH_PREFIX_SIZE,
};
use super::{HubProtocol, ParsedMessages, ProtocolType};
use crate::codec::MsgPackCodec;
use crate::config::ProtocolOptions;
use crate::converter::{SerdeTypeConverter, TypeConverter};
use crate::error::{EncodeError, ParseError};
use crate::message::{
    CancelInvocationMessage, CloseMessage, CompletionMessage, CompletionOutcome, HubMessage,
    InvocationMessage, MessageType, Payload, StreamInvocationMessage, StreamItemMessage,
};

/// Protocol name announced in the handshake.
pub const MSGPACK_PROTOCOL_NAME: &str = "messagepack";

/// Protocol version announced in the handshake.
pub const MSGPACK_PROTOCOL_VERSION: u32 = 1;

/// Completion result kinds.
mod result_kind {
    pub const ERROR: u64 = 1;
    pub const VOID: u64 = 2;
    pub const NON_VOID: u64 = 3;
}

/// Binary protocol carrying hub messages as MessagePack arrays.
#[derive(Debug, Clone, Default)]
pub struct MessagePackHubProtocol {
    options: ProtocolOptions,
    converter: SerdeTypeConverter,
}

impl MessagePackHubProtocol {
    /// Create a protocol with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a protocol with custom options.
    pub fn with_options(options: ProtocolOptions) -> Self {
        Self {
            options,
            converter: SerdeTypeConverter,
        }
    }

    /// Active options.
    pub fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    fn encode_array(message: &HubMessage) -> Result<Vec<Value>, EncodeError> {
        let tag = Value::from(message.message_type().tag());
        let headers = || Value::Object(Map::new());

        let array = match message {
            HubMessage::Invocation(m) => vec![
                tag,
                headers(),
                m.invocation_id.as_deref().map_or(Value::Null, Value::from),
                Value::from(m.target.as_str()),
                encode_arguments(&m.arguments)?,
            ],
            HubMessage::StreamInvocation(m) => vec![
                tag,
                headers(),
                Value::from(m.invocation_id.as_str()),
                Value::from(m.target.as_str()),
                encode_arguments(&m.arguments)?,
            ],
            HubMessage::StreamItem(m) => vec![
                tag,
                headers(),
                Value::from(m.invocation_id.as_str()),
                m.item.to_wire_value()?.into_owned(),
            ],
            HubMessage::Completion(m) => {
                let mut array = vec![tag, headers(), Value::from(m.invocation_id.as_str())];
                match &m.outcome {
                    CompletionOutcome::Error(error) => {
                        array.push(result_kind::ERROR.into());
                        array.push(error.as_str().into());
                    }
                    CompletionOutcome::Void => array.push(result_kind::VOID.into()),
                    CompletionOutcome::Result(result) => {
                        array.push(result_kind::NON_VOID.into());
                        array.push(result.to_wire_value()?.into_owned());
                    }
                }
                array
            }
            HubMessage::CancelInvocation(m) => {
                vec![tag, headers(), Value::from(m.invocation_id.as_str())]
            }
            HubMessage::Ping => vec![tag],
            HubMessage::Close(m) => vec![
                tag,
                m.error.as_deref().map_or(Value::Null, Value::from),
            ],
        };

        Ok(array)
    }

    fn decode_message(body: &[u8]) -> Result<HubMessage, ParseError> {
        let items = match MsgPackCodec::decode_tree(body)? {
            Value::Array(items) => items,
            other => {
                return Err(ParseError::malformed(
                    format!("expected a MessagePack array, got {other}"),
                    body,
                ))
            }
        };

        let tag = match items.first() {
            Some(value) => value.as_u64().ok_or_else(|| ParseError::InvalidField {
                field: "type",
                reason: format!("expected an unsigned integer, got {value}"),
            })?,
            None => return Err(ParseError::malformed("empty message array", body)),
        };
        let elements = Elements {
            kind: MessageType::try_from(tag)?,
            items,
        };

        let message: HubMessage = match elements.kind {
            MessageType::Invocation => {
                elements.headers(1)?;
                InvocationMessage {
                    invocation_id: elements.optional_string(2, "invocationId")?,
                    target: elements.string(3, "target")?,
                    arguments: elements.arguments(4)?,
                }
                .into()
            }
            MessageType::StreamInvocation => {
                elements.headers(1)?;
                StreamInvocationMessage {
                    invocation_id: elements.string(2, "invocationId")?,
                    target: elements.string(3, "target")?,
                    arguments: elements.arguments(4)?,
                }
                .into()
            }
            MessageType::StreamItem => {
                elements.headers(1)?;
                StreamItemMessage {
                    invocation_id: elements.string(2, "invocationId")?,
                    item: elements.value(3, "item")?.clone().into(),
                }
                .into()
            }
            MessageType::Completion => {
                elements.headers(1)?;
                let invocation_id = elements.string(2, "invocationId")?;
                let kind = elements.value(3, "resultKind")?;
                let outcome = match kind.as_u64() {
                    Some(result_kind::ERROR) => {
                        CompletionOutcome::Error(elements.string(4, "error")?)
                    }
                    Some(result_kind::VOID) => CompletionOutcome::Void,
                    Some(result_kind::NON_VOID) => {
                        CompletionOutcome::Result(elements.value(4, "result")?.clone().into())
                    }
                    _ => {
                        return Err(ParseError::InvalidField {
                            field: "resultKind",
                            reason: format!("unknown result kind {kind}"),
                        })
                    }
                };
                CompletionMessage {
                    invocation_id,
                    outcome,
                }
                .into()
            }
            MessageType::CancelInvocation => {
                elements.headers(1)?;
                CancelInvocationMessage {
                    invocation_id: elements.string(2, "invocationId")?,
                }
                .into()
            }
            MessageType::Ping => HubMessage::Ping,
            MessageType::Close => CloseMessage {
                error: elements.optional_string(1, "error")?,
            }
            .into(),
        };

        Ok(message)
    }
}

impl HubProtocol for MessagePackHubProtocol {
    fn name(&self) -> &str {
        MSGPACK_PROTOCOL_NAME
    }

    fn version(&self) -> u32 {
        MSGPACK_PROTOCOL_VERSION
    }

    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::Binary
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        &self.converter
    }

    fn parse_messages(&self, input: &[u8]) -> ParsedMessages {
        let max = self.options.max_message_size;
        parse_frames(
            input,
            |buf| scan_binary_frame(buf, max),
            Self::decode_message,
        )
    }

    fn write_message(&self, message: &HubMessage) -> Result<Bytes, EncodeError> {
        let array = Self::encode_array(message)?;
        let body = MsgPackCodec::encode(&array)?;

        if body.len() > self.options.max_message_size {
            return Err(EncodeError::MessageTooLarge {
                size: body.len(),
                max: self.options.max_message_size,
            });
        }

        let mut bytes = Vec::with_capacity(MAX_LENGTH_PREFIX_SIZE + body.len());
        encode_length_prefix(body.len(), &mut bytes);
        bytes.extend_from_slice(&body);

        tracing::trace!(
            message_type = ?message.message_type(),
            len = bytes.len(),
            "wrote hub message"
        );
        Ok(Bytes::from(bytes))
    }
}

fn encode_arguments(arguments: &[Payload]) -> Result<Value, EncodeError> {
    arguments
        .iter()
        .map(|argument| argument.to_wire_value().map(|v| v.into_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Positional access to the elements of one decoded message array.
struct Elements {
    kind: MessageType,
    items: Vec<Value>,
}

impl Elements {
    fn value(&self, index: usize, field: &'static str) -> Result<&Value, ParseError> {
        self.items.get(index).ok_or(ParseError::MissingField {
            message_type: self.kind,
            field,
        })
    }

    fn string(&self, index: usize, field: &'static str) -> Result<String, ParseError> {
        match self.value(index, field)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ParseError::InvalidField {
                field,
                reason: format!("expected a string, got {other}"),
            }),
        }
    }

    fn optional_string(
        &self,
        index: usize,
        field: &'static str,
    ) -> Result<Option<String>, ParseError> {
        match self.items.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ParseError::InvalidField {
                field,
                reason: format!("expected a string or nil, got {other}"),
            }),
        }
    }

    fn arguments(&self, index: usize) -> Result<Vec<Payload>, ParseError> {
        match self.value(index, "arguments")? {
            Value::Array(values) => Ok(values.iter().cloned().map(Payload::from).collect()),
            other => Err(ParseError::InvalidField {
                field: "arguments",
                reason: format!("expected an array, got {other}"),
            }),
        }
    }

    /// Headers must be a map (or nil); their contents are not used.
    fn headers(&self, index: usize) -> Result<(), ParseError> {
        match self.value(index, "headers")? {
            Value::Object(_) | Value::Null => Ok(()),
            other => Err(ParseError::InvalidField {
                field: "headers",
                reason: format!("expected a map, got {other}"),
            }),
        }
    }
}
