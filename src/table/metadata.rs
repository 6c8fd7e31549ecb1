//! Resolved table metadata as handed to the planner
//!
//! Metadata resolution itself lives outside the planner. This module only
//! describes the shape the planner consumes: declared primary-key columns,
//! non-key columns with their families, and the physical flags (salting,
//! multi-tenancy, view index id) that change the row-key prefix.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Column family used when a table declares no default family
pub const DEFAULT_COLUMN_FAMILY: &str = "0";

/// Stable column identifier, independent of display or index naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl ColumnId {
    /// Reserved id of the implicit salt byte column
    pub const SALT: ColumnId = ColumnId(u32::MAX);
    /// Reserved id of the implicit view index id column
    pub const VIEW_INDEX_ID: ColumnId = ColumnId(u32::MAX - 1);

    pub fn is_reserved(&self) -> bool {
        *self == Self::SALT || *self == Self::VIEW_INDEX_ID
    }
}

/// Row-key encodable column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// UTF-8 text, variable length
    Varchar,
    /// Raw bytes, variable length
    Varbinary,
    /// Single unsigned byte (salt)
    Byte,
}

impl KeyType {
    /// Returns true if values of this type occupy a fixed number of key bytes
    pub fn is_fixed_width(&self) -> bool {
        matches!(self, KeyType::Integer | KeyType::BigInt | KeyType::Byte)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Integer => "INTEGER",
            KeyType::BigInt => "BIGINT",
            KeyType::Varchar => "VARCHAR",
            KeyType::Varbinary => "VARBINARY",
            KeyType::Byte => "BYTE",
        }
    }
}

/// Kind of relation the statement resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
    Index,
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub name: String,
    pub key_type: KeyType,
    /// Column family; `None` for primary-key columns
    pub family: Option<String>,
}

impl ColumnDef {
    /// Primary-key column
    pub fn pk(id: u32, name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            id: ColumnId(id),
            name: name.into(),
            key_type,
            family: None,
        }
    }

    /// Non-key column stored in `family`
    pub fn value(id: u32, family: impl Into<String>, name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            id: ColumnId(id),
            name: name.into(),
            key_type,
            family: Some(family.into()),
        }
    }
}

/// Resolved table metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Logical table name
    pub name: String,
    /// Physical (storage) table name; statistics are keyed by it
    pub physical_name: String,
    pub kind: TableKind,
    /// Salt bucket count for salted tables
    pub salt_buckets: Option<u32>,
    /// Whether the first declared PK column is the tenant id
    pub multi_tenant: bool,
    /// View index id for indexes on views
    pub view_index_id: Option<i64>,
    /// Declared primary-key columns, in PK order
    pub pk_columns: Vec<ColumnDef>,
    /// Non-key columns
    pub value_columns: Vec<ColumnDef>,
    /// Declared default column family
    pub default_family: Option<String>,
}

impl TableMetadata {
    /// Creates metadata for a plain table whose physical name equals its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            physical_name: name.clone(),
            name,
            kind: TableKind::Table,
            salt_buckets: None,
            multi_tenant: false,
            view_index_id: None,
            pk_columns: Vec::new(),
            value_columns: Vec::new(),
            default_family: None,
        }
    }

    pub fn with_physical_name(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = physical_name.into();
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Appends a primary-key column
    pub fn with_pk(mut self, column: ColumnDef) -> Self {
        self.pk_columns.push(column);
        self
    }

    /// Appends a non-key column
    pub fn with_value_column(mut self, column: ColumnDef) -> Self {
        self.value_columns.push(column);
        self
    }

    pub fn salted(mut self, buckets: u32) -> Self {
        self.salt_buckets = Some(buckets);
        self
    }

    pub fn multi_tenant(mut self) -> Self {
        self.multi_tenant = true;
        self
    }

    /// Marks the table as an index on a view with the given view index id
    pub fn view_index(mut self, view_index_id: i64) -> Self {
        self.kind = TableKind::Index;
        self.view_index_id = Some(view_index_id);
        self
    }

    pub fn with_default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = Some(family.into());
        self
    }

    pub fn is_salted(&self) -> bool {
        self.salt_buckets.map_or(false, |b| b > 0)
    }

    pub fn is_index(&self) -> bool {
        self.kind == TableKind::Index
    }

    /// Distinct column families declared by non-key columns, sorted
    pub fn column_families(&self) -> Vec<&str> {
        let families: BTreeSet<&str> = self
            .value_columns
            .iter()
            .filter_map(|c| c.family.as_deref())
            .collect();
        families.into_iter().collect()
    }

    /// Family holding the empty key value of each row
    pub fn empty_column_family(&self) -> &str {
        self.default_family.as_deref().unwrap_or(DEFAULT_COLUMN_FAMILY)
    }

    /// Finds a declared column (key or non-key) by exact name
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.pk_columns
            .iter()
            .chain(self.value_columns.iter())
            .find(|c| c.name == name)
    }
}
