//! Guidepost snapshots
//!
//! A guidepost is a row key sampled at regular intervals of a table's key
//! space, with the rows, bytes and collection timestamp of the stretch of
//! keys ending at it. Keys are stored front-coded in ascending order.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::codec::PrefixEncoder;
use super::decoder::GuidepostDecoder;
use super::errors::GuidePostsError;

/// Statistics lookup key: physical table and column family
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuidePostsKey {
    pub physical_name: String,
    pub column_family: String,
}

impl GuidePostsKey {
    pub fn new(physical_name: impl Into<String>, column_family: impl Into<String>) -> Self {
        Self {
            physical_name: physical_name.into(),
            column_family: column_family.into(),
        }
    }
}

impl fmt::Display for GuidePostsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.physical_name, self.column_family)
    }
}

/// Immutable guidepost snapshot, index-aligned with decode order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidePostsInfo {
    encoded_keys: Vec<u8>,
    max_key_length: usize,
    count: usize,
    row_counts: Vec<u64>,
    byte_counts: Vec<u64>,
    timestamps: Vec<i64>,
}

impl GuidePostsInfo {
    /// The "no statistics" sentinel
    pub const NO_GUIDEPOSTS: GuidePostsInfo = GuidePostsInfo {
        encoded_keys: Vec::new(),
        max_key_length: 0,
        count: 0,
        row_counts: Vec::new(),
        byte_counts: Vec::new(),
        timestamps: Vec::new(),
    };

    /// Builds a snapshot, checking that every array has `count` entries.
    ///
    /// Every key byte appears in the encoded stream at least once, so
    /// `max_key_length` can never exceed its length.
    pub fn new(
        encoded_keys: Vec<u8>,
        max_key_length: usize,
        count: usize,
        row_counts: Vec<u64>,
        byte_counts: Vec<u64>,
        timestamps: Vec<i64>,
    ) -> Result<Self, GuidePostsError> {
        for (array, len) in [
            ("row_counts", row_counts.len()),
            ("byte_counts", byte_counts.len()),
            ("timestamps", timestamps.len()),
        ] {
            if len != count {
                return Err(GuidePostsError::LengthMismatch { array, count, len });
            }
        }
        if max_key_length > encoded_keys.len() {
            return Err(GuidePostsError::MaxKeyLengthOutOfRange {
                max_key_length,
                encoded_len: encoded_keys.len(),
            });
        }

        Ok(Self {
            encoded_keys,
            max_key_length,
            count,
            row_counts,
            byte_counts,
            timestamps,
        })
    }

    /// Shared handle to the sentinel
    pub fn none() -> Arc<Self> {
        Arc::new(Self::NO_GUIDEPOSTS)
    }

    pub fn builder() -> GuidePostsInfoBuilder {
        GuidePostsInfoBuilder::new()
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::NO_GUIDEPOSTS
    }

    pub fn encoded_keys(&self) -> &[u8] {
        &self.encoded_keys
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn row_counts(&self) -> &[u64] {
        &self.row_counts
    }

    pub fn byte_counts(&self) -> &[u64] {
        &self.byte_counts
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Sum of row counts, saturating at `u64::MAX`
    pub fn total_rows(&self) -> u64 {
        self.row_counts.iter().fold(0, |acc, n| acc.saturating_add(*n))
    }

    /// Sum of byte counts, saturating at `u64::MAX`
    pub fn total_bytes(&self) -> u64 {
        self.byte_counts.iter().fold(0, |acc, n| acc.saturating_add(*n))
    }

    /// Approximate in-memory footprint in bytes
    pub fn estimated_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.encoded_keys.len()
            + self.count * (std::mem::size_of::<u64>() * 2 + std::mem::size_of::<i64>())
    }

    /// Lazily decodes the guideposts in key order
    pub fn decoder(&self) -> GuidepostDecoder<'_> {
        GuidepostDecoder::new(self)
    }
}

/// Accumulates ascending guideposts into a [`GuidePostsInfo`]
#[derive(Debug, Default)]
pub struct GuidePostsInfoBuilder {
    encoder: PrefixEncoder,
    last_key: Option<Vec<u8>>,
    row_counts: Vec<u64>,
    byte_counts: Vec<u64>,
    timestamps: Vec<i64>,
}

impl GuidePostsInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a guidepost; keys must be non-empty and strictly ascending
    pub fn add_guidepost(
        &mut self,
        key: &[u8],
        row_count: u64,
        byte_count: u64,
        timestamp: i64,
    ) -> Result<&mut Self, GuidePostsError> {
        if key.is_empty() {
            return Err(GuidePostsError::EmptyKey);
        }
        if self.last_key.as_deref().map_or(false, |last| key <= last) {
            return Err(GuidePostsError::OutOfOrder);
        }

        self.encoder.encode(key);
        self.last_key = Some(key.to_vec());
        self.row_counts.push(row_count);
        self.byte_counts.push(byte_count);
        self.timestamps.push(timestamp);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.row_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_counts.is_empty()
    }

    pub fn build(self) -> GuidePostsInfo {
        let count = self.row_counts.len();
        GuidePostsInfo {
            max_key_length: self.encoder.max_key_length(),
            encoded_keys: self.encoder.finish(),
            count,
            row_counts: self.row_counts,
            byte_counts: self.byte_counts,
            timestamps: self.timestamps,
        }
    }
}
