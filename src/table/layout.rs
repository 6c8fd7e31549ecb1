//! Physical primary-key layout
//!
//! The encoded row key always starts with the implicit prefix columns, in
//! this fixed order:
//!
//! 1. Salt byte (salted tables)
//! 2. Tenant id (multi-tenant tables with a bound tenant)
//! 3. View index id (indexes on views)
//!
//! followed by the user (DATA) columns in declared PK order. Offsets and
//! point lookups only ever reference user columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::{TableError, TableResult};
use super::metadata::{ColumnId, KeyType, TableMetadata};

/// Name of the implicit salt byte column
pub const SALT_COLUMN_NAME: &str = "_SALT";
/// Name of the implicit view index id column
pub const VIEW_INDEX_ID_COLUMN_NAME: &str = "_INDEX_ID";
/// Separator between family and column in index column names (`0:V1`, `:K1`)
pub const INDEX_COLUMN_NAME_SEP: char = ':';

/// Largest salt bucket count a single salt byte can address
pub const MAX_SALT_BUCKETS: u32 = 256;

/// Role of a column within the physical row key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyColumnRole {
    Salt,
    Tenant,
    ViewIndexId,
    Data,
}

impl KeyColumnRole {
    /// Returns true for roles stripped before user columns begin
    pub fn is_prefix(&self) -> bool {
        !matches!(self, KeyColumnRole::Data)
    }
}

/// One column of the physical row key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalKeyColumn {
    pub id: ColumnId,
    pub name: String,
    pub role: KeyColumnRole,
    /// Position within the physical row key
    pub ordinal: usize,
    pub key_type: KeyType,
}

/// Maps an index column name back to the data-table column name.
///
/// Index columns are stored as `<family>:<column>` (`:K1` for key columns);
/// everything up to and including the first separator is dropped. Names
/// without a separator are returned unchanged.
pub fn data_column_name(name: &str) -> &str {
    name.split_once(INDEX_COLUMN_NAME_SEP)
        .map_or(name, |(_, column)| column)
}

/// Ordered physical key columns of a table, derived once per statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyLayout {
    table_name: String,
    columns: Vec<PhysicalKeyColumn>,
    prefix_len: usize,
    salt_buckets: Option<u32>,
    tenant_id: Option<String>,
    view_index_id: Option<i64>,
    is_index: bool,
}

impl PrimaryKeyLayout {
    /// Derives the layout of `table` for a connection bound to `tenant_id`.
    ///
    /// The tenant column only becomes a prefix column when the table is
    /// multi-tenant AND a tenant is bound; a global connection addresses it
    /// like any other user column.
    pub fn derive(table: &TableMetadata, tenant_id: Option<&str>) -> TableResult<Self> {
        if table.pk_columns.is_empty() {
            return Err(TableError::EmptyPrimaryKey(table.name.clone()));
        }

        let mut seen_names = HashSet::new();
        let mut seen_ids = HashSet::new();
        for column in &table.pk_columns {
            if !seen_names.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.id.is_reserved() || !seen_ids.insert(column.id) {
                return Err(TableError::DuplicateColumnId(column.id.0));
            }
        }

        let mut columns = Vec::with_capacity(table.pk_columns.len() + 2);

        let salt_buckets = match table.salt_buckets {
            Some(b) if b > MAX_SALT_BUCKETS => return Err(TableError::InvalidSaltBuckets(b)),
            Some(b) if b > 0 => Some(b),
            _ => None,
        };
        if salt_buckets.is_some() {
            columns.push(PhysicalKeyColumn {
                id: ColumnId::SALT,
                name: SALT_COLUMN_NAME.to_string(),
                role: KeyColumnRole::Salt,
                ordinal: 0,
                key_type: KeyType::Byte,
            });
        }

        let mut declared = table.pk_columns.iter();
        let bound_tenant = if table.multi_tenant { tenant_id } else { None };

        if table.multi_tenant {
            // First declared column is the tenant id
            if let Some(tenant_column) = declared.next() {
                let role = if bound_tenant.is_some() {
                    KeyColumnRole::Tenant
                } else {
                    KeyColumnRole::Data
                };
                columns.push(PhysicalKeyColumn {
                    id: tenant_column.id,
                    name: tenant_column.name.clone(),
                    role,
                    ordinal: columns.len(),
                    key_type: tenant_column.key_type,
                });
            }
        }

        let view_index_id = if table.is_index() { table.view_index_id } else { None };
        // An unbound tenant column would sit between the salt byte and the
        // view index id, splitting the prefix.
        if view_index_id.is_some() && table.multi_tenant && bound_tenant.is_none() {
            return Err(TableError::TenantRequired(table.name.clone()));
        }
        if view_index_id.is_some() {
            columns.push(PhysicalKeyColumn {
                id: ColumnId::VIEW_INDEX_ID,
                name: VIEW_INDEX_ID_COLUMN_NAME.to_string(),
                role: KeyColumnRole::ViewIndexId,
                ordinal: columns.len(),
                key_type: KeyType::BigInt,
            });
        }

        for column in declared {
            columns.push(PhysicalKeyColumn {
                id: column.id,
                name: column.name.clone(),
                role: KeyColumnRole::Data,
                ordinal: columns.len(),
                key_type: column.key_type,
            });
        }

        let prefix_len = columns.iter().take_while(|c| c.role.is_prefix()).count();
        if prefix_len == columns.len() {
            return Err(TableError::NoUserColumns(table.name.clone()));
        }

        Ok(Self {
            table_name: table.name.clone(),
            columns,
            prefix_len,
            salt_buckets,
            tenant_id: bound_tenant.map(str::to_string),
            view_index_id,
            is_index: table.is_index(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All physical key columns, prefix first
    pub fn columns(&self) -> &[PhysicalKeyColumn] {
        &self.columns
    }

    /// The DATA-role columns, in declared PK order
    pub fn user_columns(&self) -> &[PhysicalKeyColumn] {
        &self.columns[self.prefix_len..]
    }

    /// Number of implicit prefix columns stripped before user columns
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn user_column_count(&self) -> usize {
        self.columns.len() - self.prefix_len
    }

    pub fn salt_buckets(&self) -> Option<u32> {
        self.salt_buckets
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn view_index_id(&self) -> Option<i64> {
        self.view_index_id
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    /// Looks up a physical key column by id
    pub fn column(&self, id: ColumnId) -> Option<&PhysicalKeyColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Resolves a user-supplied column name to a user column.
    ///
    /// On indexes both sides are compared under their data-table names.
    pub fn resolve_user_column(&self, name: &str) -> Option<&PhysicalKeyColumn> {
        self.user_columns().iter().find(|c| {
            if self.is_index {
                data_column_name(&c.name) == data_column_name(name)
            } else {
                c.name == name
            }
        })
    }

    /// Resolves any physical key column by name (prefix columns included)
    pub fn resolve_column(&self, name: &str) -> Option<&PhysicalKeyColumn> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.resolve_user_column(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::metadata::{ColumnDef, TableKind};

    fn base_table() -> TableMetadata {
        TableMetadata::new("t")
            .with_pk(ColumnDef::pk(1, "k1", KeyType::Integer))
            .with_pk(ColumnDef::pk(2, "k2", KeyType::Integer))
            .with_pk(ColumnDef::pk(3, "k3", KeyType::Integer))
    }

    fn tenant_table() -> TableMetadata {
        TableMetadata::new("mt")
            .multi_tenant()
            .with_pk(ColumnDef::pk(1, "t_id", KeyType::Varchar))
            .with_pk(ColumnDef::pk(2, "k1", KeyType::Integer))
            .with_pk(ColumnDef::pk(3, "k2", KeyType::Integer))
    }

    fn names(columns: &[PhysicalKeyColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_plain_table_has_no_prefix() {
        let layout = PrimaryKeyLayout::derive(&base_table(), None).unwrap();
        assert_eq!(layout.prefix_len(), 0);
        assert_eq!(layout.user_column_count(), 3);
        assert_eq!(names(layout.user_columns()), vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn test_salted_table_strips_one_column() {
        let layout = PrimaryKeyLayout::derive(&base_table().salted(4), None).unwrap();
        assert_eq!(layout.prefix_len(), 1);
        assert_eq!(layout.columns()[0].role, KeyColumnRole::Salt);
        assert_eq!(layout.user_column_count(), 3);
    }

    #[test]
    fn test_bound_tenant_is_prefix() {
        let layout = PrimaryKeyLayout::derive(&tenant_table(), Some("acme")).unwrap();
        assert_eq!(layout.prefix_len(), 1);
        assert_eq!(layout.tenant_id(), Some("acme"));
        assert_eq!(names(layout.user_columns()), vec!["k1", "k2"]);
    }

    #[test]
    fn test_unbound_tenant_is_user_column() {
        let layout = PrimaryKeyLayout::derive(&tenant_table(), None).unwrap();
        assert_eq!(layout.prefix_len(), 0);
        assert_eq!(layout.tenant_id(), None);
        assert_eq!(names(layout.user_columns()), vec!["t_id", "k1", "k2"]);
    }

    #[test]
    fn test_tenant_ignored_on_single_tenant_table() {
        let layout = PrimaryKeyLayout::derive(&base_table(), Some("acme")).unwrap();
        assert_eq!(layout.prefix_len(), 0);
        assert_eq!(layout.tenant_id(), None);
    }

    #[test]
    fn test_prefix_order_salt_tenant_view_index() {
        let table = tenant_table().salted(8).view_index(-32768);
        let layout = PrimaryKeyLayout::derive(&table, Some("acme")).unwrap();

        let roles: Vec<KeyColumnRole> = layout.columns().iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                KeyColumnRole::Salt,
                KeyColumnRole::Tenant,
                KeyColumnRole::ViewIndexId,
                KeyColumnRole::Data,
                KeyColumnRole::Data,
            ]
        );
        for (i, column) in layout.columns().iter().enumerate() {
            assert_eq!(column.ordinal, i);
        }
    }

    #[test]
    fn test_view_index_with_unbound_tenant_rejected() {
        let table = tenant_table().view_index(3);
        let result = PrimaryKeyLayout::derive(&table, None);
        assert_eq!(result.unwrap_err(), TableError::TenantRequired("mt".into()));
    }

    #[test]
    fn test_view_index_id_ignored_on_plain_table() {
        let mut table = base_table();
        table.view_index_id = Some(5);
        let layout = PrimaryKeyLayout::derive(&table, None).unwrap();
        assert_eq!(layout.prefix_len(), 0);
        assert_eq!(layout.view_index_id(), None);
    }

    #[test]
    fn test_empty_pk_rejected() {
        let result = PrimaryKeyLayout::derive(&TableMetadata::new("empty"), None);
        assert_eq!(result.unwrap_err(), TableError::EmptyPrimaryKey("empty".into()));
    }

    #[test]
    fn test_tenant_only_pk_rejected_when_bound() {
        let table = TableMetadata::new("mt")
            .multi_tenant()
            .with_pk(ColumnDef::pk(1, "t_id", KeyType::Varchar));
        let result = PrimaryKeyLayout::derive(&table, Some("acme"));
        assert_eq!(result.unwrap_err(), TableError::NoUserColumns("mt".into()));
    }

    #[test]
    fn test_invalid_salt_buckets_rejected() {
        let result = PrimaryKeyLayout::derive(&base_table().salted(300), None);
        assert_eq!(result.unwrap_err(), TableError::InvalidSaltBuckets(300));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let table = base_table().with_pk(ColumnDef::pk(9, "k1", KeyType::Integer));
        assert!(matches!(
            PrimaryKeyLayout::derive(&table, None),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_data_column_name_mapping() {
        assert_eq!(data_column_name(":k1"), "k1");
        assert_eq!(data_column_name("0:v1"), "v1");
        assert_eq!(data_column_name("k1"), "k1");
    }

    #[test]
    fn test_index_resolves_by_data_column_name() {
        let table = TableMetadata::new("idx")
            .with_kind(TableKind::Index)
            .with_pk(ColumnDef::pk(1, "0:v1", KeyType::Varchar))
            .with_pk(ColumnDef::pk(2, ":k1", KeyType::Integer));
        let layout = PrimaryKeyLayout::derive(&table, None).unwrap();

        assert_eq!(layout.resolve_user_column("v1").map(|c| c.id), Some(ColumnId(1)));
        assert_eq!(layout.resolve_user_column("k1").map(|c| c.id), Some(ColumnId(2)));
        assert!(layout.resolve_user_column("k2").is_none());
    }
}
