//! OFFSET clause compilation
//!
//! `OFFSET n` becomes a row skip. `OFFSET (c1..cn) = (v1..vn)` becomes a
//! keyset anchor: the encoded row key the scan resumes from. A tuple offset
//! must name every user primary-key column, in key order, with constant
//! values, so that it pins exactly one row key.

use std::sync::Arc;

use crate::observability::{Event, Logger, MetricsRegistry};
use crate::table::{data_column_name, PrimaryKeyLayout, TableMetadata};

use super::ast::{Literal, OffsetNode, ParseNode, SelectStatement, TableSource};
use super::context::{ParamMetadata, StatementContext};
use super::errors::{NotCoercibleReason, OffsetError, OffsetResult, UnsupportedReason};
use super::optimizer::{Expression, KeyRangeOptimizer, RowKeyColumnExpr, RowKeyOptimizer};

/// Compiled OFFSET clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetSpec {
    /// No offset
    None,
    /// Skip this many rows
    RowSkip(u32),
    /// Start the scan at this row key
    KeysetAnchor(Vec<u8>),
}

impl OffsetSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            OffsetSpec::None => "NONE",
            OffsetSpec::RowSkip(_) => "ROW_SKIP",
            OffsetSpec::KeysetAnchor(_) => "KEYSET_ANCHOR",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, OffsetSpec::None)
    }
}

/// Compiles OFFSET clauses against a key-range optimizer
#[derive(Debug, Clone, Default)]
pub struct OffsetCompiler<O = RowKeyOptimizer> {
    optimizer: O,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl OffsetCompiler<RowKeyOptimizer> {
    pub fn new() -> Self {
        Self::with_optimizer(RowKeyOptimizer::new())
    }
}

impl<O: KeyRangeOptimizer> OffsetCompiler<O> {
    pub fn with_optimizer(optimizer: O) -> Self {
        Self {
            optimizer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Compiles the statement's OFFSET clause.
    ///
    /// Bind parameters used as integer offsets get their expected type
    /// registered in the context.
    pub fn compile(&self, ctx: &mut StatementContext, stmt: &SelectStatement) -> OffsetResult<OffsetSpec> {
        let result = match &stmt.offset {
            None => Ok(OffsetSpec::None),
            Some(OffsetNode::Integer(node)) => self.compile_integer(ctx, node),
            Some(offset) => self.compile_row_value(ctx, stmt, offset),
        };

        match &result {
            Ok(spec) => {
                if let Some(metrics) = &self.metrics {
                    match spec {
                        OffsetSpec::RowSkip(_) => metrics.increment_row_skips(),
                        OffsetSpec::KeysetAnchor(_) => metrics.increment_keyset_anchors(),
                        OffsetSpec::None => {}
                    }
                }
                if !spec.is_none() {
                    Logger::trace(Event::OffsetCompiled, &[("kind", spec.kind())]);
                }
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.increment_offsets_rejected();
                }
                Logger::info(
                    Event::OffsetRejected,
                    &[("code", err.code().code()), ("message", err.message())],
                );
            }
        }

        result
    }

    fn compile_integer(&self, ctx: &mut StatementContext, node: &ParseNode) -> OffsetResult<OffsetSpec> {
        let value = match node {
            ParseNode::Literal(literal) => literal.clone(),
            ParseNode::Bind(index) => {
                ctx.binds_mut().add_param_metadata(*index, ParamMetadata::OFFSET);
                ctx.binds()
                    .value(*index)
                    .cloned()
                    .ok_or_else(|| OffsetError::bind_missing(*index))?
            }
            _ => {
                return Err(OffsetError::invalid(
                    "OFFSET must be an integer literal or bind parameter",
                ))
            }
        };

        let count = match value {
            Literal::Null => return Ok(OffsetSpec::None),
            Literal::Integer(v) => v,
            Literal::Decimal(d) if d.fract() == 0.0 && d.is_finite() && d.abs() <= i32::MAX as f64 => d as i64,
            other => {
                return Err(OffsetError::invalid(format!(
                    "OFFSET must be an integer, got {}",
                    other.type_name()
                )))
            }
        };

        if count < 0 {
            return Err(OffsetError::invalid(format!(
                "OFFSET must not be negative, got {}",
                count
            )));
        }
        if count > i64::from(i32::MAX) {
            return Err(OffsetError::invalid(format!(
                "OFFSET {} is out of range",
                count
            )));
        }

        Ok(OffsetSpec::RowSkip(count as u32))
    }

    fn compile_row_value(
        &self,
        ctx: &StatementContext,
        stmt: &SelectStatement,
        offset: &OffsetNode,
    ) -> OffsetResult<OffsetSpec> {
        let OffsetNode::RowValue { columns, values } = offset else {
            return Err(OffsetError::invalid("OFFSET must be an integer or a row value"));
        };
        if stmt.aggregate {
            return Err(OffsetError::unsupported(UnsupportedReason::Aggregate));
        }
        let table = single_base_table(stmt)?;

        let layout = PrimaryKeyLayout::derive(table, ctx.tenant_id())?;
        let user_columns = layout.user_columns();
        let num_user_columns = user_columns.len();
        let is_index = layout.is_index();

        if values.len() != num_user_columns {
            return Err(OffsetError::not_coercible(NotCoercibleReason::MustCoverPk));
        }
        if columns.len() != num_user_columns {
            return Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks));
        }

        let column_names = column_references(columns, is_index)?;

        let predicate = offset
            .equality()
            .ok_or_else(|| OffsetError::not_coercible(NotCoercibleReason::UnexpectedFailure))?;
        let optimized = match self.optimizer.optimize(ctx, table, &layout, &predicate)? {
            Some(optimized) => optimized,
            None => {
                Logger::error(
                    Event::OffsetUnexpectedShape,
                    &[("table", layout.table_name()), ("reason", "optimizer returned no result")],
                );
                return Err(OffsetError::not_coercible(NotCoercibleReason::UnexpectedFailure));
            }
        };

        let Expression::And(children) = &optimized.expression else {
            Logger::warn(
                Event::OffsetUnexpectedShape,
                &[("table", layout.table_name()), ("reason", "expected a conjunction")],
            );
            return Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks));
        };

        let key_columns = row_key_columns(children, is_index)?;
        if key_columns.len() != num_user_columns {
            let found = key_columns.len().to_string();
            Logger::warn(
                Event::OffsetUnexpectedShape,
                &[("table", layout.table_name()), ("row_key_columns", found.as_str())],
            );
            return Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks));
        }

        for ((pk, column_name), key_column) in user_columns.iter().zip(&column_names).zip(&key_columns) {
            let referenced = normalize_name(column_name, is_index);
            let resolved = normalize_name(&key_column.name, is_index);
            if resolved != referenced || key_column.column_id != pk.id {
                return Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks));
            }
        }

        match optimized.scan_ranges.point_key() {
            Some(key) => Ok(OffsetSpec::KeysetAnchor(key.to_vec())),
            None => Err(OffsetError::not_coercible(NotCoercibleReason::MustBePointLookup)),
        }
    }
}

fn single_base_table(stmt: &SelectStatement) -> OffsetResult<&TableMetadata> {
    if stmt.from.len() != 1 {
        return Err(OffsetError::unsupported(UnsupportedReason::TableCount));
    }
    if stmt.nested {
        return Err(OffsetError::unsupported(UnsupportedReason::Subquery));
    }
    match &stmt.from[0] {
        TableSource::Base(table) => Ok(table.as_ref()),
        TableSource::Derived(_) => Err(OffsetError::unsupported(UnsupportedReason::Subquery)),
    }
}

/// Column names of the offset's column tuple.
///
/// Index keys are stored in variable-length form, so one CAST around a
/// column reference is allowed there.
fn column_references(columns: &[ParseNode], is_index: bool) -> OffsetResult<Vec<&str>> {
    columns
        .iter()
        .map(|node| {
            let node = match node {
                ParseNode::Cast { child, .. } if is_index => child.as_ref(),
                other => other,
            };
            match node {
                ParseNode::Column(name) => Ok(name.as_str()),
                _ => Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks)),
            }
        })
        .collect()
}

/// Row-key columns on the left of each equality, one coercion unwrapped on indexes
fn row_key_columns(children: &[Expression], is_index: bool) -> OffsetResult<Vec<&RowKeyColumnExpr>> {
    children
        .iter()
        .map(|child| {
            let Expression::Equal(lhs, _) = child else {
                Logger::warn(Event::OffsetUnexpectedShape, &[("reason", "expected an equality")]);
                return Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks));
            };
            let lhs = if is_index { lhs.unwrap_coerce() } else { lhs.as_ref() };
            match lhs {
                Expression::RowKeyColumn(column) => Ok(column),
                _ => {
                    Logger::warn(
                        Event::OffsetUnexpectedShape,
                        &[("reason", "expected a row key column")],
                    );
                    Err(OffsetError::not_coercible(NotCoercibleReason::MustSpecifyPks))
                }
            }
        })
        .collect()
}

fn normalize_name(name: &str, is_index: bool) -> String {
    let unquoted = name.replace('"', "");
    if is_index {
        data_column_name(&unquoted).to_string()
    } else {
        unquoted
    }
}
