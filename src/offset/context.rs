//! Statement context: bound tenant and bind parameters

use std::collections::BTreeMap;

use crate::table::KeyType;

use super::ast::Literal;

/// Expected type of a bind parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMetadata {
    pub key_type: KeyType,
    pub nullable: bool,
}

impl ParamMetadata {
    /// Metadata registered for an `OFFSET ?` parameter
    pub const OFFSET: ParamMetadata = ParamMetadata {
        key_type: KeyType::Integer,
        nullable: false,
    };
}

/// Bind values and the metadata registered for them while compiling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindManager {
    /// Values by 1-based parameter index
    values: BTreeMap<usize, Literal>,
    metadata: BTreeMap<usize, ParamMetadata>,
}

impl BindManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds values to parameters `1..=values.len()`
    pub fn with_values(values: impl IntoIterator<Item = Literal>) -> Self {
        let mut binds = Self::new();
        for (i, value) in values.into_iter().enumerate() {
            binds.bind(i + 1, value);
        }
        binds
    }

    pub fn bind(&mut self, index: usize, value: Literal) {
        self.values.insert(index, value);
    }

    pub fn value(&self, index: usize) -> Option<&Literal> {
        self.values.get(&index)
    }

    /// Records the expected type of a parameter
    pub fn add_param_metadata(&mut self, index: usize, metadata: ParamMetadata) {
        self.metadata.insert(index, metadata);
    }

    pub fn param_metadata(&self, index: usize) -> Option<&ParamMetadata> {
        self.metadata.get(&index)
    }
}

/// Per-statement compilation context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementContext {
    tenant_id: Option<String>,
    binds: BindManager,
}

impl StatementContext {
    /// Context of a global (tenant-less) connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Context of a connection bound to `tenant_id`
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            binds: BindManager::new(),
        }
    }

    pub fn with_binds(mut self, values: impl IntoIterator<Item = Literal>) -> Self {
        self.binds = BindManager::with_values(values);
        self
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn binds(&self) -> &BindManager {
        &self.binds
    }

    pub fn binds_mut(&mut self) -> &mut BindManager {
        &mut self.binds
    }
}
