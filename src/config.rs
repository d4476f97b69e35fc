//! Protocol options.
//!
//! Options deserialize with serde so they can be embedded in a larger
//! client configuration file; missing fields fall back to defaults.
//!
//! ```
//! use hubwire::ProtocolOptions;
//!
//! let options: ProtocolOptions = serde_json::from_str(r#"{"max_message_size": 65536}"#).unwrap();
//! assert_eq!(options.max_message_size, 65536);
//! ```

use serde::{Deserialize, Serialize};

/// Default maximum message size (largest length a binary prefix may declare).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 2_147_483_647;

/// Options shared by the concrete protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolOptions {
    /// Largest message, framing excluded, accepted on read or produced on write.
    pub max_message_size: usize,
}

impl ProtocolOptions {
    /// Options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
