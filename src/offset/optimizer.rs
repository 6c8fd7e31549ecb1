//! Key-range optimization of the tuple-offset predicate
//!
//! The general WHERE optimizer is an external collaborator; the compiler
//! only talks to it through [`KeyRangeOptimizer`]. [`RowKeyOptimizer`] is a
//! reference implementation covering conjunctions of column equalities.

use std::collections::BTreeMap;

use crate::keys::{KeyRange, KeyValue, RowKeyEncoder, ScanRanges};
use crate::table::{data_column_name, ColumnId, KeyType, PrimaryKeyLayout, TableMetadata};

use super::ast::{Literal, ParseNode};
use super::context::StatementContext;
use super::errors::{NotCoercibleReason, OffsetError, OffsetResult};

/// Reference to a physical row-key column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKeyColumnExpr {
    pub column_id: ColumnId,
    /// Position in the physical key, prefix columns included
    pub position: usize,
    /// Column name as stored in the table (index names keep their family prefix)
    pub name: String,
    pub key_type: KeyType,
}

/// A compiled predicate expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    RowKeyColumn(RowKeyColumnExpr),
    /// Non-key column stored in a column family
    KeyValueColumn { family: String, name: String },
    Coerce {
        child: Box<Expression>,
        target: KeyType,
    },
    Literal(KeyValue),
    Null,
}

impl Expression {
    /// Strips one coercion layer, if present
    pub fn unwrap_coerce(&self) -> &Expression {
        match self {
            Expression::Coerce { child, .. } => child,
            other => other,
        }
    }
}

/// Output of the optimizer: the compiled predicate and the key ranges it implies
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedPredicate {
    pub expression: Expression,
    pub scan_ranges: ScanRanges,
}

/// Turns a predicate into a compiled expression plus scan ranges.
///
/// `Ok(None)` means the optimizer could not handle the predicate at all.
pub trait KeyRangeOptimizer {
    fn optimize(
        &self,
        ctx: &StatementContext,
        table: &TableMetadata,
        layout: &PrimaryKeyLayout,
        predicate: &ParseNode,
    ) -> OffsetResult<Option<OptimizedPredicate>>;
}

/// Equality-only optimizer over primary-key columns
#[derive(Debug, Clone, Copy, Default)]
pub struct RowKeyOptimizer;

impl RowKeyOptimizer {
    pub fn new() -> Self {
        Self
    }

    fn compile_node(
        &self,
        ctx: &StatementContext,
        table: &TableMetadata,
        layout: &PrimaryKeyLayout,
        node: &ParseNode,
    ) -> OffsetResult<Option<Expression>> {
        let expression = match node {
            ParseNode::Column(name) => resolve_column(table, layout, name)?,
            ParseNode::Literal(literal) => literal_expression(literal)?,
            ParseNode::Bind(index) => {
                let value = ctx
                    .binds()
                    .value(*index)
                    .ok_or_else(|| OffsetError::bind_missing(*index))?;
                literal_expression(value)?
            }
            ParseNode::Cast { child, target } => {
                match self.compile_node(ctx, table, layout, child)? {
                    Some(child) => Expression::Coerce {
                        child: Box::new(child),
                        target: *target,
                    },
                    None => return Ok(None),
                }
            }
            ParseNode::Function { name, .. } => {
                return Err(OffsetError::value_not_coercible(
                    name.clone(),
                    "(functions are not key values)",
                ))
            }
            ParseNode::RowValue(_) | ParseNode::Equal(_, _) => return Ok(None),
        };
        Ok(Some(expression))
    }

    fn scan_ranges(&self, layout: &PrimaryKeyLayout, equalities: &[Expression]) -> OffsetResult<ScanRanges> {
        let mut pinned: BTreeMap<usize, KeyValue> = BTreeMap::new();

        for equality in equalities {
            let Expression::Equal(lhs, rhs) = equality else {
                continue;
            };
            let Expression::RowKeyColumn(column) = lhs.unwrap_coerce() else {
                continue;
            };
            let value = match evaluate_constant(rhs)? {
                Some(value) => value,
                // Nothing equals NULL
                None => return Ok(ScanRanges::nothing()),
            };
            let value = coerce_value(&column.name, value, column.key_type)?;

            if pinned.get(&column.position).map_or(false, |existing| *existing != value) {
                return Ok(ScanRanges::nothing());
            }
            pinned.insert(column.position, value);
        }

        // Leading run of pinned user columns
        let mut values = Vec::new();
        for position in layout.prefix_len()..layout.columns().len() {
            match pinned.remove(&position) {
                Some(value) => values.push(value),
                None => break,
            }
        }

        let encoder = RowKeyEncoder::new(layout);
        if values.len() == layout.user_column_count() {
            return Ok(ScanRanges::point(encoder.encode(&values)?));
        }
        if layout.salt_buckets().is_some() {
            return Ok(ScanRanges::everything());
        }
        let prefix = encoder.encode_prefix(&values)?;
        if prefix.is_empty() {
            return Ok(ScanRanges::everything());
        }
        Ok(ScanRanges::single(KeyRange::prefix(prefix)))
    }
}

impl KeyRangeOptimizer for RowKeyOptimizer {
    fn optimize(
        &self,
        ctx: &StatementContext,
        table: &TableMetadata,
        layout: &PrimaryKeyLayout,
        predicate: &ParseNode,
    ) -> OffsetResult<Option<OptimizedPredicate>> {
        let ParseNode::Equal(lhs, rhs) = predicate else {
            return Ok(None);
        };

        // Tuple equality is rewritten into per-column equalities
        let (pairs, is_tuple) = match (lhs.as_ref(), rhs.as_ref()) {
            (ParseNode::RowValue(columns), ParseNode::RowValue(values)) => {
                if columns.len() != values.len() {
                    return Err(OffsetError::not_coercible(NotCoercibleReason::MustCoverPk));
                }
                (columns.iter().zip(values.iter()).collect::<Vec<_>>(), true)
            }
            (l, r) => (vec![(l, r)], false),
        };

        let mut equalities = Vec::with_capacity(pairs.len());
        for (l, r) in pairs {
            let (Some(l), Some(r)) = (
                self.compile_node(ctx, table, layout, l)?,
                self.compile_node(ctx, table, layout, r)?,
            ) else {
                return Ok(None);
            };
            equalities.push(Expression::Equal(Box::new(l), Box::new(r)));
        }

        let scan_ranges = self.scan_ranges(layout, &equalities)?;
        let expression = if is_tuple {
            Expression::And(equalities)
        } else {
            equalities.remove(0)
        };

        Ok(Some(OptimizedPredicate {
            expression,
            scan_ranges,
        }))
    }
}

fn resolve_column(table: &TableMetadata, layout: &PrimaryKeyLayout, name: &str) -> OffsetResult<Expression> {
    if let Some(column) = layout.resolve_column(name) {
        return Ok(Expression::RowKeyColumn(RowKeyColumnExpr {
            column_id: column.id,
            position: column.ordinal,
            name: column.name.clone(),
            key_type: column.key_type,
        }));
    }

    let (family, column_name) = match name.split_once('.') {
        Some((family, column)) => (Some(family), column),
        None => (None, name),
    };
    let found = table.value_columns.iter().find(|c| {
        let name_matches = if layout.is_index() {
            data_column_name(&c.name) == data_column_name(column_name)
        } else {
            c.name == column_name
        };
        name_matches && family.map_or(true, |f| c.family.as_deref() == Some(f))
    });

    match found {
        Some(column) => Ok(Expression::KeyValueColumn {
            family: column
                .family
                .clone()
                .unwrap_or_else(|| table.empty_column_family().to_string()),
            name: column.name.clone(),
        }),
        None => Err(OffsetError::column_not_found(name)),
    }
}

fn literal_expression(literal: &Literal) -> OffsetResult<Expression> {
    let value = match literal {
        Literal::Null => return Ok(Expression::Null),
        Literal::Integer(v) => KeyValue::Int(*v),
        Literal::Decimal(d) if d.fract() == 0.0 && d.abs() < 9.0e18 => KeyValue::Int(*d as i64),
        Literal::Text(s) => KeyValue::Text(s.clone()),
        other => {
            return Err(OffsetError::value_not_coercible(
                other.type_name(),
                format!("({} is not a key type)", other.type_name()),
            ))
        }
    };
    Ok(Expression::Literal(value))
}

/// Folds a constant expression; `None` for NULL
fn evaluate_constant(expression: &Expression) -> OffsetResult<Option<KeyValue>> {
    match expression {
        Expression::Literal(value) => Ok(Some(value.clone())),
        Expression::Null => Ok(None),
        Expression::Coerce { child, target } => match evaluate_constant(child)? {
            Some(value) => cast_value(value, *target).map(Some),
            None => Ok(None),
        },
        other => Err(OffsetError::value_not_coercible(
            expression_name(other),
            "(not a constant)",
        )),
    }
}

/// Explicit CAST semantics: converts between integers and text
fn cast_value(value: KeyValue, target: KeyType) -> OffsetResult<KeyValue> {
    match (value, target) {
        (KeyValue::Int(v), KeyType::Varchar) => Ok(KeyValue::Text(v.to_string())),
        (KeyValue::Text(s), KeyType::Integer | KeyType::BigInt) => s
            .trim()
            .parse::<i64>()
            .map(KeyValue::Int)
            .map_err(|_| OffsetError::value_not_coercible(s, format!("(cannot cast to {})", target.as_str()))),
        (value, _) => Ok(value),
    }
}

/// Implicit coercion of a value to its column's type
fn coerce_value(column: &str, value: KeyValue, key_type: KeyType) -> OffsetResult<KeyValue> {
    let compatible = matches!(
        (&value, key_type),
        (KeyValue::Int(_), KeyType::Integer | KeyType::BigInt | KeyType::Byte)
            | (KeyValue::Text(_), KeyType::Varchar | KeyType::Varbinary)
            | (KeyValue::Bytes(_), KeyType::Varbinary)
    );
    if compatible {
        Ok(value)
    } else {
        Err(OffsetError::value_not_coercible(
            column,
            format!("({} to {})", value.type_name(), key_type.as_str()),
        ))
    }
}

fn expression_name(expression: &Expression) -> String {
    match expression {
        Expression::RowKeyColumn(column) => column.name.clone(),
        Expression::KeyValueColumn { family, name } => format!("{}.{}", family, name),
        _ => "expression".to_string(),
    }
}
