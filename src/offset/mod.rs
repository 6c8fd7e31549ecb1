//! OFFSET compilation
//!
//! Turns a statement's OFFSET clause into an [`OffsetSpec`]: nothing, a
//! number of rows to skip, or a keyset anchor over the physical row key.

mod ast;
mod compiler;
mod context;
mod errors;
mod optimizer;
mod scan;

pub use ast::{Literal, OffsetNode, ParseNode, SelectStatement, TableSource};
pub use compiler::{OffsetCompiler, OffsetSpec};
pub use context::{BindManager, ParamMetadata, StatementContext};
pub use errors::{
    NotCoercibleReason, OffsetError, OffsetErrorCode, OffsetResult, Severity, UnsupportedReason,
};
pub use optimizer::{Expression, KeyRangeOptimizer, OptimizedPredicate, RowKeyColumnExpr, RowKeyOptimizer};
pub use scan::{scan_rows, ResumeMode};
