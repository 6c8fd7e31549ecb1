//! Table metadata and physical primary-key layout
//!
//! The planner never resolves metadata itself; it receives a resolved
//! [`TableMetadata`] and derives a [`PrimaryKeyLayout`] from it once per
//! statement.
//!
//! # Invariants
//!
//! - Prefix columns come first, in the fixed order SALT, TENANT, VIEW_INDEX_ID
//! - User columns follow in declared PK order
//! - Column identity is carried by [`ColumnId`], never by display name

mod errors;
mod layout;
mod metadata;

pub use errors::{TableError, TableResult};
pub use layout::{
    data_column_name, KeyColumnRole, PhysicalKeyColumn, PrimaryKeyLayout, INDEX_COLUMN_NAME_SEP,
    MAX_SALT_BUCKETS, SALT_COLUMN_NAME, VIEW_INDEX_ID_COLUMN_NAME,
};
pub use metadata::{ColumnDef, ColumnId, KeyType, TableKind, TableMetadata, DEFAULT_COLUMN_FAMILY};
