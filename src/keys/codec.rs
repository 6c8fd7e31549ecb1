//! Order-preserving row-key encoding
//!
//! Layout of an encoded key:
//!
//! ```text
//! [salt byte] [tenant id 0x00] [view index id] col1 [0x00] col2 ... colN
//! ```
//!
//! - Fixed-width integers are big-endian with the sign bit flipped, so
//!   unsigned byte order matches numeric order
//! - Variable-length values are raw bytes followed by a `0x00` separator,
//!   except after the last column of a complete key
//! - The salt byte is a hash of the rest of the key modulo the bucket count

use crate::table::{KeyColumnRole, KeyType, PhysicalKeyColumn, PrimaryKeyLayout, MAX_SALT_BUCKETS};

use super::errors::{KeyError, KeyResult};

/// Terminates variable-length values inside a key
pub const SEPARATOR_BYTE: u8 = 0x00;

const SIGN_FLIP_MASK_32: u32 = 1u32 << 31;
const SIGN_FLIP_MASK_64: u64 = 1u64 << 63;

/// A value bound to a key column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl KeyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            KeyValue::Int(_) => "INTEGER",
            KeyValue::Text(_) => "VARCHAR",
            KeyValue::Bytes(_) => "VARBINARY",
        }
    }
}

pub fn encode_i32_ordered(value: i32) -> [u8; 4] {
    ((value as u32) ^ SIGN_FLIP_MASK_32).to_be_bytes()
}

pub fn decode_i32_ordered(bytes: [u8; 4]) -> i32 {
    (u32::from_be_bytes(bytes) ^ SIGN_FLIP_MASK_32) as i32
}

pub fn encode_i64_ordered(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_FLIP_MASK_64).to_be_bytes()
}

pub fn decode_i64_ordered(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_FLIP_MASK_64) as i64
}

/// Salt byte for `key` (the key without its salt) over `buckets` buckets
pub fn salt_byte(key: &[u8], buckets: u32) -> u8 {
    let count = u64::from(buckets.clamp(1, MAX_SALT_BUCKETS));
    let mut mixed: u64 = 0x9E37_79B9_7F4A_7C15;
    for b in key {
        mixed ^= u64::from(*b);
        mixed = mixed.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        mixed ^= mixed >> 27;
        mixed = mixed.wrapping_mul(0x94D0_49BB_1331_11EB);
        mixed ^= mixed >> 31;
    }
    (mixed % count) as u8
}

/// Encodes user-column values into full physical row keys for one layout
#[derive(Debug, Clone, Copy)]
pub struct RowKeyEncoder<'a> {
    layout: &'a PrimaryKeyLayout,
}

impl<'a> RowKeyEncoder<'a> {
    pub fn new(layout: &'a PrimaryKeyLayout) -> Self {
        Self { layout }
    }

    /// Encodes a complete key from one value per user column.
    ///
    /// Prefix columns (salt, tenant, view index id) are filled from the layout.
    pub fn encode(&self, values: &[KeyValue]) -> KeyResult<Vec<u8>> {
        let expected = self.layout.user_column_count();
        if values.len() != expected {
            return Err(KeyError::ArityMismatch {
                expected,
                actual: values.len(),
            });
        }
        self.encode_columns(values)
    }

    /// Encodes the leading user columns.
    ///
    /// A trailing variable-length value keeps its separator, so the prefix
    /// only matches keys holding exactly that value. Salted tables have no
    /// usable prefix since the salt depends on the full key.
    pub fn encode_prefix(&self, values: &[KeyValue]) -> KeyResult<Vec<u8>> {
        let expected = self.layout.user_column_count();
        if values.len() > expected {
            return Err(KeyError::ArityMismatch {
                expected,
                actual: values.len(),
            });
        }
        if values.len() == expected {
            return self.encode(values);
        }
        if self.layout.salt_buckets().is_some() {
            return Err(KeyError::SaltedPrefix(values.len()));
        }
        self.encode_columns(values)
    }

    fn encode_columns(&self, values: &[KeyValue]) -> KeyResult<Vec<u8>> {
        let columns = &self.layout.columns()[..self.layout.prefix_len() + values.len()];
        let complete = values.len() == self.layout.user_column_count();
        let last = columns.len().saturating_sub(1);

        let mut key = Vec::with_capacity(columns.len() * 8);
        let mut user_values = values.iter();

        for (i, column) in columns.iter().enumerate() {
            let prefix_value;
            let value = match column.role {
                KeyColumnRole::Salt => continue,
                KeyColumnRole::Tenant => {
                    prefix_value = KeyValue::Text(self.layout.tenant_id().unwrap_or_default().to_string());
                    &prefix_value
                }
                KeyColumnRole::ViewIndexId => {
                    prefix_value = KeyValue::Int(self.layout.view_index_id().unwrap_or_default());
                    &prefix_value
                }
                KeyColumnRole::Data => user_values.next().ok_or(KeyError::ArityMismatch {
                    expected: self.layout.user_column_count(),
                    actual: values.len(),
                })?,
            };

            encode_value(&mut key, column, value)?;

            if !column.key_type.is_fixed_width() && !(complete && i == last) {
                key.push(SEPARATOR_BYTE);
            }
        }

        if let Some(buckets) = self.layout.salt_buckets() {
            let salt = salt_byte(&key, buckets);
            key.insert(0, salt);
        }

        Ok(key)
    }
}

fn encode_value(key: &mut Vec<u8>, column: &PhysicalKeyColumn, value: &KeyValue) -> KeyResult<()> {
    let out_of_range = |v: i64| KeyError::OutOfRange {
        column: column.name.clone(),
        value: v,
    };

    match (column.key_type, value) {
        (KeyType::Integer, KeyValue::Int(v)) => {
            let v = i32::try_from(*v).map_err(|_| out_of_range(*v))?;
            key.extend_from_slice(&encode_i32_ordered(v));
        }
        (KeyType::BigInt, KeyValue::Int(v)) => {
            key.extend_from_slice(&encode_i64_ordered(*v));
        }
        (KeyType::Byte, KeyValue::Int(v)) => {
            key.push(u8::try_from(*v).map_err(|_| out_of_range(*v))?);
        }
        (KeyType::Varchar, KeyValue::Text(s)) | (KeyType::Varbinary, KeyValue::Text(s)) => {
            push_variable(key, column, s.as_bytes())?;
        }
        (KeyType::Varbinary, KeyValue::Bytes(b)) => {
            push_variable(key, column, b)?;
        }
        _ => {
            return Err(KeyError::TypeMismatch {
                column: column.name.clone(),
                expected: column.key_type.as_str(),
            })
        }
    }
    Ok(())
}

fn push_variable(key: &mut Vec<u8>, column: &PhysicalKeyColumn, bytes: &[u8]) -> KeyResult<()> {
    if bytes.contains(&SEPARATOR_BYTE) {
        return Err(KeyError::SeparatorInValue(column.name.clone()));
    }
    key.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnDef, TableMetadata};

    fn int_table() -> TableMetadata {
        TableMetadata::new("t")
            .with_pk(ColumnDef::pk(1, "k1", KeyType::Integer))
            .with_pk(ColumnDef::pk(2, "k2", KeyType::Integer))
            .with_pk(ColumnDef::pk(3, "k3", KeyType::Integer))
    }

    fn ints(values: &[i64]) -> Vec<KeyValue> {
        values.iter().map(|v| KeyValue::Int(*v)).collect()
    }

    #[test]
    fn test_ordered_integers_sort_numerically() {
        let values = [i32::MIN, -5, -1, 0, 1, 7, i32::MAX];
        let encoded: Vec<[u8; 4]> = values.iter().map(|v| encode_i32_ordered(*v)).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);

        for v in values {
            assert_eq!(decode_i32_ordered(encode_i32_ordered(v)), v);
        }
        assert_eq!(decode_i64_ordered(encode_i64_ordered(-42)), -42);
    }

    #[test]
    fn test_encode_complete_key() {
        let layout = PrimaryKeyLayout::derive(&int_table(), None).unwrap();
        let key = RowKeyEncoder::new(&layout).encode(&ints(&[2, 3, 2])).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&encode_i32_ordered(2));
        expected.extend_from_slice(&encode_i32_ordered(3));
        expected.extend_from_slice(&encode_i32_ordered(2));
        assert_eq!(key, expected);
    }

    #[test]
    fn test_keys_sort_in_tuple_order() {
        let layout = PrimaryKeyLayout::derive(&int_table(), None).unwrap();
        let encoder = RowKeyEncoder::new(&layout);
        let a = encoder.encode(&ints(&[2, 3, 2])).unwrap();
        let b = encoder.encode(&ints(&[2, 3, 3])).unwrap();
        let c = encoder.encode(&ints(&[3, 0, 0])).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_arity_mismatch() {
        let layout = PrimaryKeyLayout::derive(&int_table(), None).unwrap();
        let result = RowKeyEncoder::new(&layout).encode(&ints(&[1, 2]));
        assert_eq!(
            result.unwrap_err(),
            KeyError::ArityMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_varchar_separators() {
        let table = TableMetadata::new("t")
            .with_pk(ColumnDef::pk(1, "a", KeyType::Varchar))
            .with_pk(ColumnDef::pk(2, "b", KeyType::Varchar));
        let layout = PrimaryKeyLayout::derive(&table, None).unwrap();
        let encoder = RowKeyEncoder::new(&layout);

        let key = encoder
            .encode(&[KeyValue::Text("ab".into()), KeyValue::Text("c".into())])
            .unwrap();
        assert_eq!(key, b"ab\0c".to_vec());

        let prefix = encoder.encode_prefix(&[KeyValue::Text("ab".into())]).unwrap();
        assert_eq!(prefix, b"ab\0".to_vec());
    }

    #[test]
    fn test_separator_in_value_rejected() {
        let table = TableMetadata::new("t").with_pk(ColumnDef::pk(1, "a", KeyType::Varchar));
        let layout = PrimaryKeyLayout::derive(&table, None).unwrap();
        let result = RowKeyEncoder::new(&layout).encode(&[KeyValue::Text("a\0b".into())]);
        assert_eq!(result.unwrap_err(), KeyError::SeparatorInValue("a".into()));
    }

    #[test]
    fn test_tenant_and_view_index_prefix() {
        let table = TableMetadata::new("idx")
            .multi_tenant()
            .view_index(-7)
            .with_pk(ColumnDef::pk(1, "t_id", KeyType::Varchar))
            .with_pk(ColumnDef::pk(2, ":k1", KeyType::Integer));
        let layout = PrimaryKeyLayout::derive(&table, Some("acme")).unwrap();
        let key = RowKeyEncoder::new(&layout).encode(&ints(&[5])).unwrap();

        let mut expected = b"acme\0".to_vec();
        expected.extend_from_slice(&encode_i64_ordered(-7));
        expected.extend_from_slice(&encode_i32_ordered(5));
        assert_eq!(key, expected);
    }

    #[test]
    fn test_salted_key_starts_with_bucket() {
        let layout = PrimaryKeyLayout::derive(&int_table().salted(4), None).unwrap();
        let encoder = RowKeyEncoder::new(&layout);
        let key = encoder.encode(&ints(&[2, 3, 1])).unwrap();

        assert_eq!(key.len(), 13);
        assert!(key[0] < 4);
        assert_eq!(key[0], salt_byte(&key[1..], 4));
        assert_eq!(encoder.encode_prefix(&ints(&[2])).unwrap_err(), KeyError::SaltedPrefix(1));
    }

    #[test]
    fn test_type_mismatch_and_range() {
        let layout = PrimaryKeyLayout::derive(&int_table(), None).unwrap();
        let encoder = RowKeyEncoder::new(&layout);

        let result = encoder.encode(&[KeyValue::Text("a".into()), KeyValue::Int(1), KeyValue::Int(2)]);
        assert!(matches!(result, Err(KeyError::TypeMismatch { .. })));

        let result = encoder.encode(&ints(&[i64::from(i32::MAX) + 1, 0, 0]));
        assert!(matches!(result, Err(KeyError::OutOfRange { .. })));
    }
}
