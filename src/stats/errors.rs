//! Statistics errors

use std::io;

use thiserror::Error;

/// Result type for statistics loading
pub type StatsResult<T> = Result<T, StatsError>;

/// Invalid guidepost construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuidePostsError {
    #[error("Guidepost count {count} does not match {array} length {len}")]
    LengthMismatch {
        array: &'static str,
        count: usize,
        len: usize,
    },

    #[error("Guidepost keys must not be empty")]
    EmptyKey,

    #[error("Guidepost keys must be strictly ascending")]
    OutOfOrder,

    #[error("Guidepost key of {len} bytes exceeds the {max} byte limit")]
    KeyTooLong { len: usize, max: usize },

    #[error("Maximum key length {max_key_length} exceeds the {encoded_len} encoded key bytes")]
    MaxKeyLengthOutOfRange {
        max_key_length: usize,
        encoded_len: usize,
    },
}

/// Malformed prefix-coded key stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unexpected end of guidepost stream")]
    UnexpectedEof,

    #[error("Malformed varint")]
    MalformedVarint,

    #[error("Shared prefix of {prefix} bytes exceeds previous key of {previous} bytes")]
    PrefixOutOfRange { prefix: usize, previous: usize },

    #[error("Decoded key of {len} bytes exceeds the {max} byte limit")]
    KeyTooLong { len: usize, max: usize },
}

/// Statistics could not be obtained
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Statistics source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No statistics for {0}")]
    TableNotFound(String),

    #[error("Statistics I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt statistics for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Invalid statistics key {0}")]
    InvalidKey(String),

    #[error("Invalid guideposts: {0}")]
    InvalidGuidePosts(#[from] GuidePostsError),
}

impl StatsError {
    /// Returns true if the statistics simply do not exist
    pub fn is_missing(&self) -> bool {
        matches!(self, StatsError::SourceUnavailable(_) | StatsError::TableNotFound(_))
    }
}
