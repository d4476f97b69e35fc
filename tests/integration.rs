//! Integration tests for hubwire.
//!
//! These run every protocol through the `HubProtocol` trait object, the way
//! a connection layer holds the protocol it negotiated.

use hubwire::converter::TypeConverter;
use hubwire::{
    payloads, CancelInvocationMessage, CloseMessage, CompletionMessage, EncodeError, HubError,
    HubMessage, HubProtocol, InvocationMessage, JsonHubProtocol, MessageBuffer,
    MessagePackHubProtocol, MessageType, ParseError, Payload, ProtocolType, StreamInvocationMessage,
    StreamItemMessage, PING,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn protocols() -> Vec<Box<dyn HubProtocol>> {
    vec![
        Box::new(JsonHubProtocol::new()),
        Box::new(MessagePackHubProtocol::new()),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    user: String,
    text: String,
    tags: Vec<String>,
}

fn chat() -> ChatMessage {
    ChatMessage {
        user: "ann".to_string(),
        text: "hi there".to_string(),
        tags: vec!["greeting".to_string()],
    }
}

/// One valid message of every kind, including edge shapes.
fn every_message() -> Vec<HubMessage> {
    vec![
        InvocationMessage::new("Send", payloads!["hello", 42])
            .with_invocation_id("1")
            .into(),
        InvocationMessage::new("Broadcast", payloads![chat(), -3, 2.5, true, ()]).into(),
        InvocationMessage::new("NoArgs", payloads![]).into(),
        StreamItemMessage::new("s-1", json!({"tick": 1})).into(),
        StreamItemMessage::new("s-1", Payload::null()).into(),
        CompletionMessage::with_result("2", Payload::encodable(chat())).into(),
        CompletionMessage::with_result("3", Payload::null()).into(),
        CompletionMessage::void("4").into(),
        CompletionMessage::with_error("7", "boom").into(),
        StreamInvocationMessage::new("s-1", "Counter", payloads![10, 500]).into(),
        CancelInvocationMessage::new("s-1").into(),
        HubMessage::ping(),
        CloseMessage::new().into(),
        CloseMessage::with_error("server shutting down").into(),
    ]
}

#[test]
fn test_round_trip_every_message() {
    for protocol in protocols() {
        for message in every_message() {
            let bytes = protocol.write_message(&message).unwrap();
            let parsed = protocol.parse_messages(&bytes);

            assert_eq!(parsed.consumed, bytes.len(), "{}", protocol.name());
            assert_eq!(
                parsed.into_messages().unwrap(),
                vec![message.clone()],
                "{}",
                protocol.name()
            );
        }
    }
}

#[test]
fn test_concatenation_preserves_order() {
    for protocol in protocols() {
        let messages = every_message();
        let mut bytes = Vec::new();
        for message in &messages {
            bytes.extend_from_slice(&protocol.write_message(message).unwrap());
        }

        let parsed = protocol.parse_messages(&bytes);
        assert!(!parsed.is_incomplete(bytes.len()));
        assert_eq!(parsed.into_messages().unwrap(), messages);
    }
}

#[test]
fn test_partial_buffer_is_incomplete_not_error() {
    for protocol in protocols() {
        for message in every_message() {
            let bytes = protocol.write_message(&message).unwrap();
            let truncated = &bytes[..bytes.len() - 1];

            let parsed = protocol.parse_messages(truncated);
            assert!(parsed.items.is_empty(), "{}", protocol.name());
            assert!(!parsed.has_errors());
            assert_eq!(parsed.consumed, 0);
            assert!(parsed.is_incomplete(truncated.len()));
            assert_eq!(parsed.remainder(truncated), truncated);
        }
    }
}

#[test]
fn test_complete_then_partial() {
    for protocol in protocols() {
        let first = protocol.write_message(&HubMessage::Ping).unwrap();
        let second = protocol
            .write_message(&CompletionMessage::with_error("7", "boom").into())
            .unwrap();

        let mut bytes = first.to_vec();
        bytes.extend_from_slice(&second[..second.len() / 2]);

        let parsed = protocol.parse_messages(&bytes);
        assert_eq!(parsed.consumed, first.len());
        assert_eq!(parsed.remainder(&bytes), &second[..second.len() / 2]);
        assert_eq!(parsed.into_messages().unwrap(), vec![PING]);
    }
}

#[test]
fn test_empty_input() {
    for protocol in protocols() {
        let parsed = protocol.parse_messages(&[]);
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.consumed, 0);
        assert!(!parsed.is_incomplete(0));
    }
}

#[test]
fn test_ping_singleton() {
    let a = HubMessage::ping();
    let b = HubMessage::ping();
    assert_eq!(a, b);
    assert_eq!(a, PING);

    for protocol in protocols() {
        let bytes = protocol.write_message(&PING).unwrap();
        assert_eq!(protocol.parse_messages(&bytes).into_messages().unwrap(), vec![PING]);
    }
}

#[test]
fn test_unknown_type_tag_json() {
    let protocol = JsonHubProtocol::new();
    let parsed = protocol.parse_messages(b"{\"type\":8}\x1e");
    assert_eq!(parsed.consumed, 11);
    assert_eq!(
        parsed.into_messages().unwrap_err(),
        ParseError::UnknownMessageType(8)
    );
}

#[test]
fn test_unknown_type_tag_msgpack() {
    // length 2, fixarray(1), fixint 8
    let protocol = MessagePackHubProtocol::new();
    let parsed = protocol.parse_messages(&[0x02, 0x91, 0x08]);
    assert_eq!(parsed.consumed, 3);
    assert_eq!(
        parsed.into_messages().unwrap_err(),
        ParseError::UnknownMessageType(8)
    );
}

#[test]
fn test_bad_message_between_good_ones() {
    let json = JsonHubProtocol::new();
    let mut bytes = json.write_message(&PING).unwrap().to_vec();
    bytes.extend_from_slice(b"{\"type\":3}\x1e");
    bytes.extend_from_slice(
        &json
            .write_message(&CancelInvocationMessage::new("9").into())
            .unwrap(),
    );

    let parsed = json.parse_messages(&bytes);
    assert_eq!(parsed.consumed, bytes.len());
    assert_eq!(parsed.items.len(), 3);
    assert_eq!(parsed.items[0], Ok(PING));
    assert_eq!(
        parsed.items[1],
        Err(ParseError::MissingField {
            message_type: MessageType::Completion,
            field: "invocationId"
        })
    );
    assert_eq!(
        parsed.items[2],
        Ok(HubMessage::from(CancelInvocationMessage::new("9")))
    );
}

#[test]
fn test_send_invocation_scenario() {
    for protocol in protocols() {
        let message: HubMessage = InvocationMessage::new("Send", payloads!["hello", 42])
            .with_invocation_id("1")
            .into();

        let bytes = protocol.write_message(&message).unwrap();
        let mut parsed = protocol.parse_messages(&bytes).into_messages().unwrap();
        assert_eq!(parsed.len(), 1);

        let HubMessage::Invocation(invocation) = parsed.remove(0) else {
            panic!("expected invocation from {}", protocol.name());
        };
        assert_eq!(invocation.target, "Send");
        assert_eq!(invocation.invocation_id.as_deref(), Some("1"));
        assert_eq!(invocation.arguments.len(), 2);

        let converter: &dyn TypeConverter = protocol.type_converter();
        let text: String = converter.convert_payload(&invocation.arguments[0]).unwrap();
        let number: i64 = converter.convert_payload(&invocation.arguments[1]).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(number, 42);
    }
}

#[test]
fn test_error_completion_scenario() {
    for protocol in protocols() {
        let bytes = protocol
            .write_message(&CompletionMessage::with_error("7", "boom").into())
            .unwrap();
        let mut parsed = protocol.parse_messages(&bytes).into_messages().unwrap();

        let HubMessage::Completion(completion) = parsed.remove(0) else {
            panic!("expected completion from {}", protocol.name());
        };
        assert_eq!(completion.invocation_id, "7");
        assert_eq!(completion.error(), Some("boom"));
        assert!(!completion.has_result());
        assert!(completion.result().is_none());
    }
}

#[test]
fn test_typed_result_round_trip() {
    for protocol in protocols() {
        let bytes = protocol
            .write_message(&CompletionMessage::with_result("2", Payload::encodable(chat())).into())
            .unwrap();
        let mut parsed = protocol.parse_messages(&bytes).into_messages().unwrap();

        let HubMessage::Completion(completion) = parsed.remove(0) else {
            panic!("expected completion");
        };
        let result = completion.result().and_then(Payload::as_value).unwrap();
        let decoded: ChatMessage = protocol.type_converter().convert(result).unwrap();
        assert_eq!(decoded, chat());
    }
}

#[test]
fn test_unrepresentable_payload_is_encode_error() {
    use std::collections::HashMap;

    let mut by_pair = HashMap::new();
    by_pair.insert((1u8, 2u8), "value");
    let message: HubMessage =
        StreamItemMessage::new("s-1", Payload::encodable(by_pair)).into();

    for protocol in protocols() {
        let err = protocol.write_message(&message).unwrap_err();
        assert!(matches!(err, EncodeError::Payload(_)), "{}", protocol.name());
    }
}

#[test]
fn test_protocol_identity() {
    let protocols = protocols();
    let identities: Vec<_> = protocols
        .iter()
        .map(|p| (p.name().to_string(), p.version(), p.protocol_type()))
        .collect();

    assert_eq!(
        identities,
        vec![
            ("json".to_string(), 1, ProtocolType::Text),
            ("messagepack".to_string(), 1, ProtocolType::Binary),
        ]
    );
}

#[test]
fn test_message_buffer_across_chunks() {
    for protocol in protocols() {
        let messages = every_message();
        let mut bytes = Vec::new();
        for message in &messages {
            bytes.extend_from_slice(&protocol.write_message(message).unwrap());
        }

        let mut buffer = MessageBuffer::new(protocol);
        let mut received = Vec::new();
        for chunk in bytes.chunks(7) {
            for item in buffer.push(chunk) {
                received.push(item.unwrap());
            }
        }

        assert_eq!(received, messages);
        assert!(buffer.is_empty());
    }
}

#[test]
fn test_parse_from_many_threads() {
    use std::sync::Arc;
    use std::thread;

    let protocol: Arc<dyn HubProtocol> = Arc::new(MessagePackHubProtocol::new());
    let bytes = Arc::new(
        protocol
            .write_message(&StreamItemMessage::new("s-1", json!([1, 2, 3])).into())
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let protocol = Arc::clone(&protocol);
            let bytes = Arc::clone(&bytes);
            thread::spawn(move || protocol.parse_messages(&bytes).into_messages().unwrap())
        })
        .collect();

    for handle in handles {
        let messages = handle.join().unwrap();
        assert_eq!(
            messages,
            vec![HubMessage::from(StreamItemMessage::new("s-1", json!([1, 2, 3])))]
        );
    }
}

/// Decode every two-argument `Send` invocation delivered in `chunk`.
fn received_sends(
    buffer: &mut MessageBuffer<Box<dyn HubProtocol>>,
    chunk: &[u8],
) -> hubwire::error::Result<Vec<(String, i64)>> {
    let mut sends = Vec::new();
    for message in buffer.push_messages(chunk)? {
        let HubMessage::Invocation(invocation) = message else {
            continue;
        };
        let [text, number] = &invocation.arguments[..] else {
            continue;
        };
        let converter = buffer.protocol().type_converter();
        sends.push((
            converter.convert_payload(text)?,
            converter.convert_payload(number)?,
        ));
    }
    Ok(sends)
}

#[test]
fn test_hub_error_from_buffer_and_converter() {
    for protocol in protocols() {
        let good = protocol
            .write_message(&InvocationMessage::new("Send", payloads!["hello", 42]).into())
            .unwrap();
        let bad_argument = protocol
            .write_message(&InvocationMessage::new("Send", payloads!["hello", "42"]).into())
            .unwrap();
        let unknown_type = match protocol.protocol_type() {
            ProtocolType::Text => b"{\"type\":9}\x1e".to_vec(),
            ProtocolType::Binary => vec![0x02, 0x91, 0x09],
        };

        let mut buffer = MessageBuffer::new(protocol);

        assert_eq!(
            received_sends(&mut buffer, &good).unwrap(),
            vec![("hello".to_string(), 42)]
        );

        let err = received_sends(&mut buffer, &bad_argument).unwrap_err();
        assert!(matches!(err, HubError::Convert(_)), "{err}");

        let err = received_sends(&mut buffer, &unknown_type).unwrap_err();
        assert!(
            matches!(err, HubError::Parse(ParseError::UnknownMessageType(9))),
            "{err}"
        );
        assert!(buffer.is_empty());
    }
}
