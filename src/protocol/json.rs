//! JSON hub protocol.
//!
//! Every message is a JSON object terminated by `0x1E`:
//! ```text
//! {"type":1,"invocationId":"1","target":"Send","arguments":["hello",42]}␞
//! {"type":3,"invocationId":"7","error":"boom"}␞
//! {"type":6}␞
//! ```
//!
//! A completion's `result` key is written only when the completion has a
//! result, so `"result":null` is a null result while a missing key is a
//! void completion. Unknown keys are ignored on read.

use bytes::Bytes;
use serde_json::{Map, Value};

use super::framing::{parse_frames, scan_text_frame, RECORD_SEPARATOR};
use super::{HubProtocol, ParsedMessages, ProtocolType};
use crate::codec::JsonCodec;
use crate::config::ProtocolOptions;
use crate::converter::{SerdeTypeConverter, TypeConverter};
use crate::error::{EncodeError, ParseError};
use crate::message::{
    CancelInvocationMessage, CloseMessage, CompletionMessage, CompletionOutcome, HubMessage,
    InvocationMessage, MessageType, Payload, StreamInvocationMessage, StreamItemMessage,
};

/// Protocol name announced in the handshake.
pub const JSON_PROTOCOL_NAME: &str = "json";

/// Protocol version announced in the handshake.
pub const JSON_PROTOCOL_VERSION: u32 = 1;

const TYPE: &str = "type";
const TARGET: &str = "target";
const INVOCATION_ID: &str = "invocationId";
const ARGUMENTS: &str = "arguments";
const ITEM: &str = "item";
const RESULT: &str = "result";
const ERROR: &str = "error";

/// Text protocol carrying hub messages as JSON objects.
#[derive(Debug, Clone, Default)]
pub struct JsonHubProtocol {
    options: ProtocolOptions,
    converter: SerdeTypeConverter,
}

impl JsonHubProtocol {
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

    fn encode_object(message: &HubMessage) -> Result<Map<String, Value>, EncodeError> {
        let mut object = Map::new();
        object.insert(TYPE.into(), message.message_type().tag().into());

        match message {
            HubMessage::Invocation(m) => {
                if let Some(id) = &m.invocation_id {
                    object.insert(INVOCATION_ID.into(), id.as_str().into());
                }
                object.insert(TARGET.into(), m.target.as_str().into());
                object.insert(ARGUMENTS.into(), encode_arguments(&m.arguments)?);
            }
            HubMessage::StreamInvocation(m) => {
                object.insert(INVOCATION_ID.into(), m.invocation_id.as_str().into());
                object.insert(TARGET.into(), m.target.as_str().into());
                object.insert(ARGUMENTS.into(), encode_arguments(&m.arguments)?);
            }
            HubMessage::StreamItem(m) => {
                object.insert(INVOCATION_ID.into(), m.invocation_id.as_str().into());
                object.insert(ITEM.into(), m.item.to_wire_value()?.into_owned());
            }
            HubMessage::Completion(m) => {
                object.insert(INVOCATION_ID.into(), m.invocation_id.as_str().into());
                match &m.outcome {
                    CompletionOutcome::Void => {}
                    CompletionOutcome::Result(result) => {
                        object.insert(RESULT.into(), result.to_wire_value()?.into_owned());
                    }
                    CompletionOutcome::Error(error) => {
                        object.insert(ERROR.into(), error.as_str().into());
                    }
                }
            }
            HubMessage::CancelInvocation(m) => {
                object.insert(INVOCATION_ID.into(), m.invocation_id.as_str().into());
            }
            HubMessage::Ping => {}
            HubMessage::Close(m) => {
                if let Some(error) = &m.error {
                    object.insert(ERROR.into(), error.as_str().into());
                }
            }
        }

        Ok(object)
    }

    fn decode_message(body: &[u8]) -> Result<HubMessage, ParseError> {
        let object = match JsonCodec::decode::<Value>(body)? {
            Value::Object(object) => object,
            other => {
                return Err(ParseError::malformed(
                    format!("expected a JSON object, got {}", json_kind(&other)),
                    body,
                ))
            }
        };

        let tag = match object.get(TYPE) {
            Some(value) => value.as_u64().ok_or_else(|| ParseError::InvalidField {
                field: TYPE,
                reason: format!("expected an unsigned integer, got {value}"),
            })?,
            None => {
                return Err(ParseError::InvalidField {
                    field: TYPE,
                    reason: "missing".to_string(),
                })
            }
        };
        let fields = Fields {
            kind: MessageType::try_from(tag)?,
            object,
        };

        let message: HubMessage = match fields.kind {
            MessageType::Invocation => InvocationMessage {
                invocation_id: fields.optional_string(INVOCATION_ID)?,
                target: fields.string(TARGET)?,
                arguments: fields.arguments()?,
            }
            .into(),
            MessageType::StreamInvocation => StreamInvocationMessage {
                invocation_id: fields.string(INVOCATION_ID)?,
                target: fields.string(TARGET)?,
                arguments: fields.arguments()?,
            }
            .into(),
            MessageType::StreamItem => StreamItemMessage {
                invocation_id: fields.string(INVOCATION_ID)?,
                item: fields.value(ITEM)?.clone().into(),
            }
            .into(),
            MessageType::Completion => {
                let invocation_id = fields.string(INVOCATION_ID)?;
                let error = fields.optional_string(ERROR)?;
                let result = fields.object.get(RESULT).cloned().map(Payload::from);
                let has_result = result.is_some();
                CompletionMessage::from_parts(invocation_id, error, result, has_result)
                    .map_err(|e| ParseError::InvalidField {
                        field: RESULT,
                        reason: e.to_string(),
                    })?
                    .into()
            }
            MessageType::CancelInvocation => CancelInvocationMessage {
                invocation_id: fields.string(INVOCATION_ID)?,
            }
            .into(),
            MessageType::Ping => HubMessage::Ping,
            MessageType::Close => CloseMessage {
                error: fields.optional_string(ERROR)?,
            }
            .into(),
        };

        Ok(message)
    }
}

impl HubProtocol for JsonHubProtocol {
    fn name(&self) -> &str {
        JSON_PROTOCOL_NAME
    }

    fn version(&self) -> u32 {
        JSON_PROTOCOL_VERSION
    }

    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::Text
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        &self.converter
    }

    fn parse_messages(&self, input: &[u8]) -> ParsedMessages {
        let max = self.options.max_message_size;
        parse_frames(
            input,
            |buf| scan_text_frame(buf, max),
            Self::decode_message,
        )
    }

    fn write_message(&self, message: &HubMessage) -> Result<Bytes, EncodeError> {
        let object = Self::encode_object(message)?;
        let mut bytes = JsonCodec::encode(&object)?;

        if bytes.len() > self.options.max_message_size {
            return Err(EncodeError::MessageTooLarge {
                size: bytes.len(),
                max: self.options.max_message_size,
            });
        }

        bytes.push(RECORD_SEPARATOR);
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

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed access to the keys of one decoded message object.
struct Fields {
    kind: MessageType,
    object: Map<String, Value>,
}

impl Fields {
    fn value(&self, field: &'static str) -> Result<&Value, ParseError> {
        self.object.get(field).ok_or(ParseError::MissingField {
            message_type: self.kind,
            field,
        })
    }

    fn string(&self, field: &'static str) -> Result<String, ParseError> {
        match self.value(field)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ParseError::InvalidField {
                field,
                reason: format!("expected a string, got {}", json_kind(other)),
            }),
        }
    }

    /// Absent and `null` both mean "not set".
    fn optional_string(&self, field: &'static str) -> Result<Option<String>, ParseError> {
        match self.object.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ParseError::InvalidField {
                field,
                reason: format!("expected a string, got {}", json_kind(other)),
            }),
        }
    }

    fn arguments(&self) -> Result<Vec<Payload>, ParseError> {
        match self.value(ARGUMENTS)? {
            Value::Array(values) => Ok(values.iter().cloned().map(Payload::from).collect()),
            other => Err(ParseError::InvalidField {
                field: ARGUMENTS,
                reason: format!("expected an array, got {}", json_kind(other)),
            }),
        }
    }
}
