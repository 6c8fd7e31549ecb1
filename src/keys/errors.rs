//! Row-key encoding errors

use thiserror::Error;

/// Result type for row-key encoding
pub type KeyResult<T> = Result<T, KeyError>;

/// Row-key encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Expected {expected} key values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Value for column '{column}' is not a {expected}")]
    TypeMismatch { column: String, expected: &'static str },

    #[error("Value {value} for column '{column}' is out of range")]
    OutOfRange { column: String, value: i64 },

    #[error("Value for column '{0}' contains the separator byte")]
    SeparatorInValue(String),

    #[error("Salted keys need every user column; got a prefix of {0}")]
    SaltedPrefix(usize),
}
