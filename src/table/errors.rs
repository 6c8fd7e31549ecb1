//! Table metadata errors

use thiserror::Error;

/// Result type for table metadata operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors raised while deriving a primary-key layout from table metadata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Table '{0}' declares no primary key columns")]
    EmptyPrimaryKey(String),

    #[error("Table '{0}' has no user primary key columns after its prefix columns")]
    NoUserColumns(String),

    #[error("Table '{0}' is a tenant-specific view index and requires a bound tenant")]
    TenantRequired(String),

    #[error("Salt bucket count {0} is out of range (1..=256)")]
    InvalidSaltBuckets(u32),

    #[error("Duplicate primary key column: {0}")]
    DuplicateColumn(String),

    #[error("Column id {0} is declared twice or collides with a reserved id")]
    DuplicateColumnId(u32),
}
