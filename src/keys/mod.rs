//! Row keys, key ranges and scan ranges
//!
//! All comparisons are unsigned lexicographic byte comparisons, the order of
//! the underlying key-value store.

mod codec;
mod errors;
mod range;
mod scan_ranges;

pub use codec::{
    decode_i32_ordered, decode_i64_ordered, encode_i32_ordered, encode_i64_ordered, salt_byte,
    KeyValue, RowKeyEncoder, SEPARATOR_BYTE,
};
pub use errors::{KeyError, KeyResult};
pub use range::{next_key, KeyRange, UNBOUND};
pub use scan_ranges::ScanRanges;

/// Serde adapter storing key bytes as base64 strings
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
