//! Parsed statement shapes consumed by the offset compiler
//!
//! The SQL parser is out of scope; these are the trees it hands over.

use std::sync::Arc;

use crate::table::{KeyType, TableMetadata};

/// A literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Boolean(bool),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "NULL",
            Literal::Integer(_) => "INTEGER",
            Literal::Decimal(_) => "DECIMAL",
            Literal::Text(_) => "VARCHAR",
            Literal::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

/// A node of a parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNode {
    /// Column reference, possibly family-qualified (`cf.col`)
    Column(String),
    Literal(Literal),
    /// Bind parameter, 1-based
    Bind(usize),
    /// `CAST(child AS target)`
    Cast {
        child: Box<ParseNode>,
        target: KeyType,
    },
    Function {
        name: String,
        args: Vec<ParseNode>,
    },
    /// Row value constructor `(a, b, ...)`
    RowValue(Vec<ParseNode>),
    Equal(Box<ParseNode>, Box<ParseNode>),
}

impl ParseNode {
    pub fn column(name: impl Into<String>) -> Self {
        ParseNode::Column(name.into())
    }

    pub fn integer(value: i64) -> Self {
        ParseNode::Literal(Literal::Integer(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        ParseNode::Literal(Literal::Text(value.into()))
    }

    pub fn null() -> Self {
        ParseNode::Literal(Literal::Null)
    }

    pub fn bind(index: usize) -> Self {
        ParseNode::Bind(index)
    }

    pub fn cast(child: ParseNode, target: KeyType) -> Self {
        ParseNode::Cast {
            child: Box::new(child),
            target,
        }
    }

    pub fn equal(lhs: ParseNode, rhs: ParseNode) -> Self {
        ParseNode::Equal(Box::new(lhs), Box::new(rhs))
    }
}

/// The OFFSET clause of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetNode {
    /// `OFFSET n` or `OFFSET ?`
    Integer(ParseNode),
    /// `OFFSET (c1, ..., cn) = (v1, ..., vn)`
    RowValue {
        columns: Vec<ParseNode>,
        values: Vec<ParseNode>,
    },
}

impl OffsetNode {
    pub fn rows(count: i64) -> Self {
        OffsetNode::Integer(ParseNode::integer(count))
    }

    /// Tuple offset over plain column names
    pub fn row_value<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        values: Vec<ParseNode>,
    ) -> Self {
        OffsetNode::RowValue {
            columns: columns.into_iter().map(ParseNode::column).collect(),
            values,
        }
    }

    pub fn is_integer_offset(&self) -> bool {
        matches!(self, OffsetNode::Integer(_))
    }

    /// The `(columns) = (values)` predicate a tuple offset stands for
    pub fn equality(&self) -> Option<ParseNode> {
        match self {
            OffsetNode::Integer(_) => None,
            OffsetNode::RowValue { columns, values } => Some(ParseNode::equal(
                ParseNode::RowValue(columns.clone()),
                ParseNode::RowValue(values.clone()),
            )),
        }
    }
}

/// A table source in FROM
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A resolved base table
    Base(Arc<TableMetadata>),
    /// A subquery in FROM, by alias
    Derived(String),
}

/// A SELECT as seen by the offset compiler
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub from: Vec<TableSource>,
    /// Has GROUP BY or aggregate functions
    pub aggregate: bool,
    /// Is itself a subquery of another statement
    pub nested: bool,
    pub offset: Option<OffsetNode>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT ... FROM table`
    pub fn from_table(table: Arc<TableMetadata>) -> Self {
        Self::new().with_source(TableSource::Base(table))
    }

    pub fn with_source(mut self, source: TableSource) -> Self {
        self.from.push(source);
        self
    }

    pub fn with_offset(mut self, offset: OffsetNode) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn aggregate(mut self) -> Self {
        self.aggregate = true;
        self
    }

    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_value_equality_shape() {
        let offset = OffsetNode::row_value(["k1", "k2"], vec![ParseNode::integer(1), ParseNode::integer(2)]);
        assert!(!offset.is_integer_offset());

        match offset.equality() {
            Some(ParseNode::Equal(lhs, rhs)) => {
                assert_eq!(
                    *lhs,
                    ParseNode::RowValue(vec![ParseNode::column("k1"), ParseNode::column("k2")])
                );
                assert_eq!(
                    *rhs,
                    ParseNode::RowValue(vec![ParseNode::integer(1), ParseNode::integer(2)])
                );
            }
            other => panic!("unexpected equality: {:?}", other),
        }
    }

    #[test]
    fn test_integer_offset_has_no_equality() {
        assert!(OffsetNode::rows(5).equality().is_none());
        assert!(OffsetNode::rows(5).is_integer_offset());
    }

    #[test]
    fn test_statement_builder() {
        let stmt = SelectStatement::new()
            .with_source(TableSource::Derived("sub".into()))
            .aggregate()
            .nested()
            .with_offset(OffsetNode::rows(1));
        assert_eq!(stmt.from.len(), 1);
        assert!(stmt.aggregate && stmt.nested);
        assert!(stmt.offset.is_some());
    }
}
