//! Message framing.
//!
//! Text protocols terminate every message with the ASCII record separator:
//! ```text
//! ┌──────────────────────┬──────┐
//! │ JSON document        │ 0x1E │
//! └──────────────────────┴──────┘
//! ```
//!
//! Binary protocols prefix every message with its length as a 7-bit varint
//! (least significant group first, high bit = more bytes follow, at most
//! 5 bytes, at most `i32::MAX`):
//! ```text
//! ┌────────────────┬──────────────────────┐
//! │ Length (1-5 B) │ MessagePack body     │
//! └────────────────┴──────────────────────┘
//! ```

use crate::error::ParseError;
use crate::message::HubMessage;

use super::ParsedMessages;

/// Record separator terminating text messages.
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Maximum bytes in a binary length prefix.
pub const MAX_LENGTH_PREFIX_SIZE: usize = 5;

/// Largest length a binary prefix may declare.
pub const MAX_PREFIXED_LENGTH: usize = i32::MAX as usize;

/// Outcome of looking for the next frame at the start of a buffer.
#[derive(Debug)]
pub(crate) enum FrameScan<'a> {
    /// A whole frame is present.
    Complete {
        /// Frame body, framing stripped.
        body: &'a [u8],
        /// Bytes the frame occupies, framing included.
        frame_len: usize,
    },
    /// Boundaries are known but the frame is rejected before decoding.
    Rejected { frame_len: usize, error: ParseError },
    /// More bytes are needed.
    Incomplete,
    /// Boundaries cannot be determined; the rest of the buffer is lost.
    Invalid(ParseError),
}

/// Split `input` into frames with `next_frame` and decode each with `decode`.
///
/// A frame that fails to decode is reported in place and parsing continues
/// with the next frame. A trailing partial frame is left unconsumed.
pub(crate) fn parse_frames<'a, F, D>(input: &'a [u8], next_frame: F, decode: D) -> ParsedMessages
where
    F: Fn(&'a [u8]) -> FrameScan<'a>,
    D: Fn(&'a [u8]) -> Result<HubMessage, ParseError>,
{
    let mut items = Vec::new();
    let mut consumed = 0;

    while consumed < input.len() {
        match next_frame(&input[consumed..]) {
            FrameScan::Complete { body, frame_len } => {
                consumed += frame_len;
                let item = if body.is_empty() {
                    Err(ParseError::EmptyFrame)
                } else {
                    decode(body)
                };
                match &item {
                    Ok(message) => tracing::trace!(
                        message_type = ?message.message_type(),
                        frame_len,
                        "parsed hub message"
                    ),
                    Err(error) => tracing::debug!(%error, frame_len, "unparseable hub message"),
                }
                items.push(item);
            }
            FrameScan::Rejected { frame_len, error } => {
                tracing::debug!(%error, frame_len, "rejected hub message");
                consumed += frame_len;
                items.push(Err(error));
            }
            FrameScan::Incomplete => break,
            FrameScan::Invalid(error) => {
                tracing::warn!(
                    %error,
                    abandoned = input.len() - consumed,
                    "message framing lost, abandoning rest of buffer"
                );
                consumed = input.len();
                items.push(Err(error));
            }
        }
    }

    ParsedMessages { items, consumed }
}

/// Find the next separator-terminated frame.
pub(crate) fn scan_text_frame(input: &[u8], max_message_size: usize) -> FrameScan<'_> {
    match input.iter().position(|&b| b == RECORD_SEPARATOR) {
        Some(end) if end > max_message_size => FrameScan::Rejected {
            frame_len: end + 1,
            error: ParseError::MessageTooLarge {
                size: end,
                max: max_message_size,
            },
        },
        Some(end) => FrameScan::Complete {
            body: &input[..end],
            frame_len: end + 1,
        },
        // No terminator yet, and no terminator can make this fit any more
        None if input.len() > max_message_size => FrameScan::Invalid(ParseError::MessageTooLarge {
            size: input.len(),
            max: max_message_size,
        }),
        None => FrameScan::Incomplete,
    }
}

/// Find the next length-prefixed frame.
pub(crate) fn scan_binary_frame(input: &[u8], max_message_size: usize) -> FrameScan<'_> {
    let (length, prefix_len) = match decode_length_prefix(input) {
        Ok(Some(decoded)) => decoded,
        Ok(None) => return FrameScan::Incomplete,
        Err(error) => return FrameScan::Invalid(error),
    };

    let frame_len = prefix_len + length;
    if length > max_message_size {
        let error = ParseError::MessageTooLarge {
            size: length,
            max: max_message_size,
        };
        // Skipping needs the whole body; waiting for it would buffer past the limit
        return if input.len() >= frame_len {
            FrameScan::Rejected { frame_len, error }
        } else {
            FrameScan::Invalid(error)
        };
    }

    if input.len() < frame_len {
        return FrameScan::Incomplete;
    }

    FrameScan::Complete {
        body: &input[prefix_len..frame_len],
        frame_len,
    }
}

/// Encode `length` as a varint prefix.
///
/// # Panics
///
/// Panics in debug builds if `length` exceeds [`MAX_PREFIXED_LENGTH`].
pub fn encode_length_prefix(length: usize, out: &mut Vec<u8>) {
    debug_assert!(length <= MAX_PREFIXED_LENGTH);
    let mut remaining = length;
    loop {
        let mut byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if remaining == 0 {
            break;
        }
    }
}

/// Decode a varint prefix.
///
/// Returns `Ok(None)` if the prefix itself is still incomplete, otherwise
/// the declared length and the number of prefix bytes.
///
/// # Errors
///
/// Returns [`ParseError::InvalidLengthPrefix`] if the prefix runs past
/// five bytes or declares more than [`MAX_PREFIXED_LENGTH`].
pub fn decode_length_prefix(input: &[u8]) -> Result<Option<(usize, usize)>, ParseError> {
    let mut length: u64 = 0;

    for (index, &byte) in input.iter().take(MAX_LENGTH_PREFIX_SIZE).enumerate() {
        length |= u64::from(byte & 0x7f) << (7 * index);

        if byte & 0x80 == 0 {
            if length > MAX_PREFIXED_LENGTH as u64 {
                return Err(ParseError::InvalidLengthPrefix(format!(
                    "declared length {length} exceeds {MAX_PREFIXED_LENGTH}"
                )));
            }
            return Ok(Some((length as usize, index + 1)));
        }

        if index + 1 == MAX_LENGTH_PREFIX_SIZE {
            return Err(ParseError::InvalidLengthPrefix(format!(
                "prefix longer than {MAX_LENGTH_PREFIX_SIZE} bytes"
            )));
        }
    }

    Ok(None)
}
