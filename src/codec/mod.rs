//! Codec module - serialization of message bodies.
//!
//! - [`JsonCodec`] - compact JSON via `serde_json`
//! - [`MsgPackCodec`] - MessagePack via `rmp-serde` (`to_vec_named`)
//!
//! # Design
//!
//! Codecs are marker structs with static methods. Each protocol picks its
//! codec at compile time; framing lives in [`crate::protocol`].

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
