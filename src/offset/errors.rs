//! Offset compilation errors
//!
//! Error codes:
//! - AERO_OFFSET_INVALID (REJECT)
//! - AERO_OFFSET_UNSUPPORTED (REJECT)
//! - AERO_OFFSET_NOT_COERCIBLE (REJECT)
//! - AERO_OFFSET_COLUMN_NOT_FOUND (REJECT)
//! - AERO_OFFSET_BIND_MISSING (REJECT)

use std::fmt;

use crate::keys::KeyError;
use crate::table::TableError;

/// Severity levels for offset errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Statement rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Offset error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetErrorCode {
    /// Integer offset is negative or not an integer
    AeroOffsetInvalid,
    /// Tuple offset used where it cannot apply
    AeroOffsetUnsupported,
    /// Tuple offset does not map onto a single primary-key point
    AeroOffsetNotCoercible,
    /// Offset references an unknown column
    AeroOffsetColumnNotFound,
    /// Offset references a bind parameter with no value
    AeroOffsetBindMissing,
}

impl OffsetErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            OffsetErrorCode::AeroOffsetInvalid => "AERO_OFFSET_INVALID",
            OffsetErrorCode::AeroOffsetUnsupported => "AERO_OFFSET_UNSUPPORTED",
            OffsetErrorCode::AeroOffsetNotCoercible => "AERO_OFFSET_NOT_COERCIBLE",
            OffsetErrorCode::AeroOffsetColumnNotFound => "AERO_OFFSET_COLUMN_NOT_FOUND",
            OffsetErrorCode::AeroOffsetBindMissing => "AERO_OFFSET_BIND_MISSING",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for OffsetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Why a tuple offset was not allowed at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    Aggregate,
    TableCount,
    Subquery,
}

impl UnsupportedReason {
    pub fn message(&self) -> &'static str {
        match self {
            UnsupportedReason::Aggregate => "RVC Offset not allowed in Aggregates",
            UnsupportedReason::TableCount => "RVC Offset not allowed with zero or multiple tables",
            UnsupportedReason::Subquery => "RVC Offset not allowed in subqueries",
        }
    }
}

/// Why a tuple offset could not be turned into a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotCoercibleReason {
    /// Value tuple arity differs from the user key columns
    MustCoverPk,
    /// Column tuple differs from the user key columns
    MustSpecifyPks,
    /// Resolved scan is not a single key
    MustBePointLookup,
    /// Optimizer produced nothing
    UnexpectedFailure,
    /// A value cannot be converted to its column's key type
    ValueNotCoercible,
}

impl NotCoercibleReason {
    pub fn message(&self) -> &'static str {
        match self {
            NotCoercibleReason::MustCoverPk => "RVC Offset must exactly cover the table's PK.",
            NotCoercibleReason::MustSpecifyPks => "RVC Offset must specify the table's PKs.",
            NotCoercibleReason::MustBePointLookup => "RVC Offset must be a point lookup.",
            NotCoercibleReason::UnexpectedFailure => "RVC Offset unexpected failure.",
            NotCoercibleReason::ValueNotCoercible => "RVC Offset value is not coercible to the PK type.",
        }
    }
}

/// Offset error with context
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetError {
    code: OffsetErrorCode,
    message: String,
    /// Column name if applicable
    column: Option<String>,
    not_coercible: Option<NotCoercibleReason>,
}

impl OffsetError {
    /// Create an invalid offset error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            code: OffsetErrorCode::AeroOffsetInvalid,
            message: reason.into(),
            column: None,
            not_coercible: None,
        }
    }

    /// Create an unsupported tuple offset error
    pub fn unsupported(reason: UnsupportedReason) -> Self {
        Self {
            code: OffsetErrorCode::AeroOffsetUnsupported,
            message: reason.message().into(),
            column: None,
            not_coercible: None,
        }
    }

    /// Create a not-coercible tuple offset error
    pub fn not_coercible(reason: NotCoercibleReason) -> Self {
        Self {
            code: OffsetErrorCode::AeroOffsetNotCoercible,
            message: reason.message().into(),
            column: None,
            not_coercible: Some(reason),
        }
    }

    /// Create a not-coercible error naming the offending value's column
    pub fn value_not_coercible(column: impl Into<String>, detail: impl fmt::Display) -> Self {
        let column = column.into();
        Self {
            code: OffsetErrorCode::AeroOffsetNotCoercible,
            message: format!(
                "{} {}",
                NotCoercibleReason::ValueNotCoercible.message(),
                detail
            ),
            column: Some(column),
            not_coercible: Some(NotCoercibleReason::ValueNotCoercible),
        }
    }

    /// Create a column not found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            code: OffsetErrorCode::AeroOffsetColumnNotFound,
            message: format!("Column '{}' not found", column),
            column: Some(column),
            not_coercible: None,
        }
    }

    /// Create a missing bind value error
    pub fn bind_missing(index: usize) -> Self {
        Self {
            code: OffsetErrorCode::AeroOffsetBindMissing,
            message: format!("No value bound for parameter {}", index),
            column: None,
            not_coercible: None,
        }
    }

    pub fn code(&self) -> OffsetErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Detail for AERO_OFFSET_NOT_COERCIBLE errors
    pub fn not_coercible_reason(&self) -> Option<NotCoercibleReason> {
        self.not_coercible
    }
}

impl fmt::Display for OffsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for OffsetError {}

impl From<TableError> for OffsetError {
    fn from(err: TableError) -> Self {
        Self {
            code: OffsetErrorCode::AeroOffsetUnsupported,
            message: err.to_string(),
            column: None,
            not_coercible: None,
        }
    }
}

impl From<KeyError> for OffsetError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::TypeMismatch { ref column, .. }
            | KeyError::OutOfRange { ref column, .. } => {
                Self::value_not_coercible(column.clone(), &err)
            }
            KeyError::SeparatorInValue(ref column) => Self::value_not_coercible(column.clone(), &err),
            KeyError::ArityMismatch { .. } => Self::not_coercible(NotCoercibleReason::MustCoverPk),
            KeyError::SaltedPrefix(_) => Self::not_coercible(NotCoercibleReason::MustBePointLookup),
        }
    }
}

/// Result type for offset compilation
pub type OffsetResult<T> = Result<T, OffsetError>;
