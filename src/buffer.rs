//! Message buffer for accumulating partial reads.
//!
//! Protocols are stateless: they report how many bytes they consumed and
//! leave any trailing partial message to the caller. `MessageBuffer` is
//! that caller for transports that deliver arbitrary chunks. It keeps the
//! unconsumed tail in a `bytes::BytesMut` and hands it back to the
//! protocol together with the next chunk.
//!
//! # Example
//!
//! ```
//! use hubwire::protocol::{HubProtocol, JsonHubProtocol};
//! use hubwire::{HubMessage, MessageBuffer};
//!
//! let protocol = JsonHubProtocol::new();
//! let bytes = protocol.write_message(&HubMessage::Ping).unwrap();
//!
//! let mut buffer = MessageBuffer::new(protocol);
//! assert!(buffer.push(&bytes[..4]).is_empty());
//! let messages = buffer.push(&bytes[4..]);
//! assert_eq!(messages.len(), 1);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Buf, BytesMut};

use crate::error::{ParseError, Result};
use crate::message::HubMessage;
use crate::protocol::HubProtocol;

/// Default initial capacity (64KB).
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Buffer that feeds incoming chunks to a protocol and retains partial messages.
pub struct MessageBuffer<P> {
    /// Protocol used to split and decode messages.
    protocol: P,
    /// Bytes received but not yet consumed.
    buffer: BytesMut,
}

impl<P: HubProtocol> MessageBuffer<P> {
    /// Create a new buffer with default capacity.
    pub fn new(protocol: P) -> Self {
        Self::with_capacity(protocol, DEFAULT_CAPACITY)
    }

    /// Create a new buffer with custom initial capacity.
    pub fn with_capacity(protocol: P, capacity: usize) -> Self {
        Self {
            protocol,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// Returns one entry per complete frame, in wire order. A frame that
    /// fails to parse yields an `Err` entry without affecting its
    /// neighbours. Partial data is kept for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<std::result::Result<HubMessage, ParseError>> {
        self.buffer.extend_from_slice(data);

        let parsed = self.protocol.parse_messages(&self.buffer);
        self.buffer.advance(parsed.consumed);

        if !self.buffer.is_empty() {
            tracing::trace!(buffered = self.buffer.len(), "waiting for rest of message");
        }

        parsed.items
    }

    /// Push data and extract complete messages, failing on the first bad frame.
    ///
    /// The buffer still advances past every complete frame, so the next
    /// push starts after the failed one.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Parse`](crate::HubError::Parse) with the first
    /// frame error in wire order.
    pub fn push_messages(&mut self, data: &[u8]) -> Result<Vec<HubMessage>> {
        let messages = self
            .push(data)
            .into_iter()
            .collect::<std::result::Result<Vec<_>, ParseError>>()?;
        Ok(messages)
    }

    /// The protocol this buffer decodes with.
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<P: HubProtocol> std::fmt::Debug for MessageBuffer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("protocol", &self.protocol.name())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
