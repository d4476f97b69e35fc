//! MsgPack codec using `rmp-serde` and `rmpv`.
//!
//! Hub messages travel as MessagePack arrays whose payload slots hold
//! intermediate `serde_json::Value` trees. Values are written with
//! `to_vec_named` so that any struct reaching the encoder keeps its field
//! names, which is what other hub peers expect.
//!
//! Peers may send values that have no JSON counterpart (`bin`, extension
//! types, non-string map keys). [`MsgPackCodec::decode_tree`] reads the
//! body as an `rmpv::Value` first and maps those onto the tree.
//!
//! # Example
//!
//! ```
//! use hubwire::codec::MsgPackCodec;
//! use serde_json::json;
//!
//! let encoded = MsgPackCodec::encode(&json!([6])).unwrap();
//! assert_eq!(encoded, vec![0x91, 0x06]);
//!
//! let decoded: serde_json::Value = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, json!([6]));
//! ```

use std::fmt::Write;

use serde_json::{json, Map, Number, Value};

use crate::error::{EncodeError, ParseError};

/// MessagePack extension type reserved for timestamps.
const TIMESTAMP_EXT: i8 = -1;

const SECONDS_PER_DAY: i64 = 86_400;

/// MessagePack codec for message bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] if the bytes cannot be deserialized to `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ParseError> {
        rmp_serde::from_slice(bytes).map_err(|e| ParseError::malformed(e, bytes))
    }

    /// Decode exactly one MsgPack value into the intermediate tree.
    ///
    /// | MessagePack            | Tree                              |
    /// |------------------------|-----------------------------------|
    /// | `bin`                  | array of byte values              |
    /// | int / bool map key     | key in decimal / `true` / `false` |
    /// | timestamp ext (-1)     | RFC 3339 UTC string               |
    /// | other ext              | `{"type": n, "data": [bytes]}`    |
    /// | NaN / infinite float   | `null`                            |
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Malformed`] if the bytes are not one complete
    /// value, a string is not UTF-8, a map key is nil, a float or a
    /// container, or a timestamp is out of range.
    pub fn decode_tree(bytes: &[u8]) -> Result<Value, ParseError> {
        let mut rest = bytes;
        let value =
            rmpv::decode::read_value(&mut rest).map_err(|e| ParseError::malformed(e, bytes))?;
        if !rest.is_empty() {
            return Err(ParseError::malformed(
                format!("{} trailing bytes after value", rest.len()),
                bytes,
            ));
        }
        into_tree(value).map_err(|reason| ParseError::malformed(reason, bytes))
    }
}

fn into_tree(value: rmpv::Value) -> Result<Value, String> {
    let tree = match value {
        rmpv::Value::Nil => Value::Null,
        rmpv::Value::Boolean(b) => Value::Bool(b),
        rmpv::Value::Integer(n) => match (n.as_u64(), n.as_i64()) {
            (Some(unsigned), _) => Value::from(unsigned),
            (None, Some(signed)) => Value::from(signed),
            (None, None) => return Err(format!("integer {n} out of range")),
        },
        rmpv::Value::F32(f) => float(f64::from(f)),
        rmpv::Value::F64(f) => float(f),
        rmpv::Value::String(s) => Value::String(s.into_str().ok_or("string is not valid UTF-8")?),
        rmpv::Value::Binary(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
        rmpv::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(into_tree)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        rmpv::Value::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| Ok((map_key(key)?, into_tree(value)?)))
                .collect::<Result<Map<_, _>, String>>()?,
        ),
        rmpv::Value::Ext(TIMESTAMP_EXT, data) => Value::String(timestamp(&data)?),
        rmpv::Value::Ext(kind, data) => json!({ "type": kind, "data": data }),
    };
    Ok(tree)
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn map_key(key: rmpv::Value) -> Result<String, String> {
    match key {
        rmpv::Value::String(s) => s
            .into_str()
            .ok_or_else(|| "map key is not valid UTF-8".to_string()),
        rmpv::Value::Integer(n) => Ok(n.to_string()),
        rmpv::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(format!("unsupported map key {other}")),
    }
}

/// Render a timestamp extension body (32, 64 or 96 bit form) as RFC 3339.
fn timestamp(data: &[u8]) -> Result<String, String> {
    let (seconds, nanos) = match *data {
        [a, b, c, d] => (i64::from(u32::from_be_bytes([a, b, c, d])), 0),
        [a, b, c, d, e, f, g, h] => {
            let packed = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
            ((packed & 0x3_ffff_ffff) as i64, (packed >> 34) as u32)
        }
        [n0, n1, n2, n3, s0, s1, s2, s3, s4, s5, s6, s7] => (
            i64::from_be_bytes([s0, s1, s2, s3, s4, s5, s6, s7]),
            u32::from_be_bytes([n0, n1, n2, n3]),
        ),
        _ => return Err(format!("timestamp extension of {} bytes", data.len())),
    };
    if nanos >= 1_000_000_000 {
        return Err(format!("timestamp nanoseconds {nanos} out of range"));
    }

    let (year, month, day) = civil_from_days(seconds.div_euclid(SECONDS_PER_DAY));
    let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
    let mut text = format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}",
        second_of_day / 3600,
        second_of_day / 60 % 60,
        second_of_day % 60
    );
    if nanos > 0 {
        let _ = write!(text, ".{nanos:09}");
    }
    text.push('Z');
    Ok(text)
}

/// Proleptic Gregorian date for a count of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let day_of_era = z.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let month = if shifted_month < 10 {
        shifted_month + 3
    } else {
        shifted_month - 9
    };
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
