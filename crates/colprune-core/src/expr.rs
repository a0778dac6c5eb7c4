//! # Expression and Operator Types
//!
//! This module defines the plan representation the pruning pass rewrites. It is
//! organized into two layers:
//!
//! ## Scalar Expressions (`Expr`)
//! Scalar expressions represent computations on individual rows: column references,
//! literal values, arithmetic, comparisons, boolean logic, and function calls. They
//! appear inside filters, join conditions, projections, aggregations, and values rows.
//! The only thing pruning needs from them is the set of columns they reference
//! ([`Expr::outer_cols`]).
//!
//! ## Relational Operators (`Operator`)
//! A closed enum over the operator kinds the pass knows about. Children are not
//! stored inline: an operator lives in a [`MemoExpr`](crate::memo::MemoExpr) next to
//! the ids of its child expressions, so identical subtrees are shared.
//!
//! The `OpKind` discriminant strips an operator down to its variant so that patterns
//! can match on shape without inspecting fields.

use crate::colset::{ColSet, ColumnId};
use crate::metadata::TableId;
use crate::properties::PhysicalProps;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar value for literals.
///
/// Uses `OrderedFloat` for `f64` so that literals can take part in `Eq`/`Hash`
/// (memo interning hashes whole operators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since 1970-01-01.
    Date(i32),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::Utf8(s) => write!(f, "'{s}'"),
            ScalarValue::Date(d) => write!(f, "date({d})"),
        }
    }
}

/// Scalar expressions used in filters, join conditions, projections and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a column produced by an input.
    Column(ColumnId),
    /// Constant literal value.
    Literal(ScalarValue),
    /// Binary operation (e.g., `a + b`, `x = y`, `price > 100`).
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (e.g., `NOT flag`, `-value`, `IS NULL`).
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Named function call (e.g., `upper(name)`).
    Function { name: String, args: Vec<Expr> },
    /// Flat conjunction.
    And(Vec<Expr>),
    /// Flat disjunction.
    Or(Vec<Expr>),
}

impl Expr {
    pub fn col(id: ColumnId) -> Self {
        Expr::Column(id)
    }

    pub fn int(v: i64) -> Self {
        Expr::Literal(ScalarValue::Int64(v))
    }

    pub fn bool(v: bool) -> Self {
        Expr::Literal(ScalarValue::Bool(v))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    /// Every column this expression references.
    pub fn outer_cols(&self) -> ColSet {
        let mut out = ColSet::new();
        self.collect_cols(&mut out);
        out
    }

    fn collect_cols(&self, out: &mut ColSet) {
        match self {
            Expr::Column(c) => {
                out.insert(*c);
            }
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_cols(out);
                right.collect_cols(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_cols(out),
            Expr::Function { args, .. } => {
                for a in args {
                    a.collect_cols(out);
                }
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                for e in exprs {
                    e.collect_cols(out);
                }
            }
        }
    }

    /// Replace column references using `f`; columns mapped to `None` are kept as-is.
    pub fn substitute(&self, f: &impl Fn(ColumnId) -> Option<Expr>) -> Expr {
        match self {
            Expr::Column(c) => f(*c).unwrap_or_else(|| Expr::Column(*c)),
            Expr::Literal(v) => Expr::Literal(v.clone()),
            Expr::BinaryOp { op, left, right } => Expr::BinaryOp {
                op: *op,
                left: Box::new(left.substitute(f)),
                right: Box::new(right.substitute(f)),
            },
            Expr::UnaryOp { op, operand } => Expr::UnaryOp {
                op: *op,
                operand: Box::new(operand.substitute(f)),
            },
            Expr::Function { name, args } => Expr::Function {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(f)).collect(),
            },
            Expr::And(exprs) => Expr::And(exprs.iter().map(|e| e.substitute(f)).collect()),
            Expr::Or(exprs) => Expr::Or(exprs.iter().map(|e| e.substitute(f)).collect()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::UnaryOp { op, operand } => write!(f, "{op:?}({operand})"),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                let sep = if matches!(self, Expr::And(_)) { " AND " } else { " OR " };
                write!(f, "(")?;
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Binary operators for comparison and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        write!(f, "{s}")
    }
}

/// Unary operators for boolean logic and null checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// SQL join types.
///
/// Semi and anti joins only produce the left side's columns, which is why their right
/// input is pruned by a dedicated rule instead of through an enclosing projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

impl JoinType {
    /// Whether the join's output includes the right input's columns.
    pub fn outputs_right(&self) -> bool {
        !matches!(self, JoinType::Semi | JoinType::Anti)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    CountRows,
    Sum,
    Avg,
    Min,
    Max,
}

/// Aggregate function applied to zero or more argument expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggExpr {
    pub func: AggFunc,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

impl AggExpr {
    pub fn new(func: AggFunc, args: Vec<Expr>) -> Self {
        Self {
            func,
            args,
            distinct: false,
        }
    }
}

/// An aggregate computation and the column that holds its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    pub col: ColumnId,
    pub agg: AggExpr,
}

impl Aggregation {
    pub fn input_cols(&self) -> ColSet {
        let mut out = ColSet::new();
        for a in &self.agg.args {
            out.union_with(&a.outer_cols());
        }
        out
    }
}

/// A projected column: `col := expr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectionItem {
    pub col: ColumnId,
    pub expr: Expr,
}

impl ProjectionItem {
    pub fn new(col: ColumnId, expr: Expr) -> Self {
        Self { col, expr }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingColumn {
    pub col: ColumnId,
    pub descending: bool,
}

/// A required ordering: a list of columns, most significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ordering(pub Vec<OrderingColumn>);

impl Ordering {
    pub fn none() -> Self {
        Self::default()
    }

    /// Ascending ordering on the given columns.
    pub fn asc(cols: &[ColumnId]) -> Self {
        Ordering(
            cols.iter()
                .map(|&col| OrderingColumn {
                    col,
                    descending: false,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cols(&self) -> ColSet {
        self.0.iter().map(|o| o.col).collect()
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, o) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}{}", if o.descending { "-" } else { "+" }, o.col.0)?;
        }
        Ok(())
    }
}

/// Which flavor of grouping a `GroupBy` operator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupingKind {
    /// One output row per distinct grouping key.
    GroupBy,
    /// No grouping columns; always exactly one output row.
    ScalarGroupBy,
    /// One arbitrary row per distinct key, chosen by `ordering`.
    DistinctOn,
}

/// The definition of a row-numbering computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowNumberDef {
    /// Column holding the row number.
    pub col: ColumnId,
    pub partition_by: ColSet,
    pub ordering: Ordering,
}

impl RowNumberDef {
    /// Input columns the definition references.
    pub fn input_cols(&self) -> ColSet {
        self.partition_by.union(&self.ordering.cols())
    }
}

/// Relational operators. Children live beside the operator in the memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Table scan producing a subset of the table's columns. Leaf.
    Scan { table: TableId, cols: ColSet },
    /// Constant rows. Leaf. Every row has one expression per column in `cols`.
    Values {
        cols: Vec<ColumnId>,
        rows: Vec<Vec<Expr>>,
    },
    /// Computes `projections` and passes `passthrough` columns of its input unchanged.
    Project {
        projections: Vec<ProjectionItem>,
        passthrough: ColSet,
    },
    /// Filters rows of its input.
    Select { filter: Expr },
    /// Combines two inputs.
    Join { join_type: JoinType, on: Expr },
    /// Groups its input by `grouping_cols` and computes `aggregations` per group.
    GroupBy {
        kind: GroupingKind,
        aggregations: Vec<Aggregation>,
        grouping_cols: ColSet,
        ordering: Ordering,
    },
    /// First `count` rows of its input under `ordering`.
    Limit { count: u64, ordering: Ordering },
    /// Skips the first `count` rows of its input under `ordering`.
    Offset { count: u64, ordering: Ordering },
    /// Adds a row-number column to its input.
    RowNumber { def: RowNumberDef },
    /// Describes the plan of its input; outputs its own text columns.
    Explain {
        cols: Vec<ColumnId>,
        props: PhysicalProps,
    },
}

/// Kind discriminant for pattern matching (without data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Scan,
    Values,
    Project,
    Select,
    Join,
    GroupBy,
    Limit,
    Offset,
    RowNumber,
    Explain,
}

impl Operator {
    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Scan { .. } => OpKind::Scan,
            Operator::Values { .. } => OpKind::Values,
            Operator::Project { .. } => OpKind::Project,
            Operator::Select { .. } => OpKind::Select,
            Operator::Join { .. } => OpKind::Join,
            Operator::GroupBy { .. } => OpKind::GroupBy,
            Operator::Limit { .. } => OpKind::Limit,
            Operator::Offset { .. } => OpKind::Offset,
            Operator::RowNumber { .. } => OpKind::RowNumber,
            Operator::Explain { .. } => OpKind::Explain,
        }
    }

    /// Number of children this operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Scan { .. } | Operator::Values { .. } => 0,
            Operator::Join { .. } => 2,
            _ => 1,
        }
    }

    /// Columns this operator reads from its inputs.
    pub fn referenced_cols(&self) -> ColSet {
        match self {
            Operator::Scan { .. } => ColSet::new(),
            Operator::Values { rows, .. } => {
                let mut out = ColSet::new();
                for e in rows.iter().flatten() {
                    out.union_with(&e.outer_cols());
                }
                out
            }
            Operator::Project {
                projections,
                passthrough,
            } => {
                let mut out = passthrough.clone();
                for p in projections {
                    out.union_with(&p.expr.outer_cols());
                }
                out
            }
            Operator::Select { filter } => filter.outer_cols(),
            Operator::Join { on, .. } => on.outer_cols(),
            Operator::GroupBy {
                aggregations,
                grouping_cols,
                ordering,
                ..
            } => {
                let mut out = grouping_cols.union(&ordering.cols());
                for a in aggregations {
                    out.union_with(&a.input_cols());
                }
                out
            }
            Operator::Limit { ordering, .. } | Operator::Offset { ordering, .. } => ordering.cols(),
            Operator::RowNumber { def } => def.input_cols(),
            Operator::Explain { props, .. } => props.cols(),
        }
    }

    /// Columns this operator defines itself rather than passing through from an input.
    pub fn defined_cols(&self) -> Vec<ColumnId> {
        match self {
            Operator::Scan { cols, .. } => cols.iter().collect(),
            Operator::Values { cols, .. } | Operator::Explain { cols, .. } => cols.clone(),
            Operator::Project { projections, .. } => projections.iter().map(|p| p.col).collect(),
            Operator::GroupBy { aggregations, .. } => aggregations.iter().map(|a| a.col).collect(),
            Operator::RowNumber { def } => vec![def.col],
            Operator::Select { .. }
            | Operator::Join { .. }
            | Operator::Limit { .. }
            | Operator::Offset { .. } => vec![],
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Scan { table, cols } => write!(f, "Scan t{} cols={}", table.0, cols),
            Operator::Values { cols, rows } => {
                let set: ColSet = cols.iter().copied().collect();
                write!(f, "Values cols={} rows={}", set, rows.len())
            }
            Operator::Project {
                projections,
                passthrough,
            } => {
                write!(f, "Project [")?;
                for (i, p) in projections.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:={}", p.col, p.expr)?;
                }
                write!(f, "] passthrough={passthrough}")
            }
            Operator::Select { filter } => write!(f, "Select {filter}"),
            Operator::Join { join_type, on } => write!(f, "{join_type:?}Join on={on}"),
            Operator::GroupBy {
                kind,
                aggregations,
                grouping_cols,
                ordering,
            } => {
                write!(f, "{kind:?} grouping={grouping_cols} aggs=[")?;
                for (i, a) in aggregations.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:={:?}", a.col, a.agg.func)?;
                }
                write!(f, "]")?;
                if !ordering.is_empty() {
                    write!(f, " ordering={ordering}")?;
                }
                Ok(())
            }
            Operator::Limit { count, ordering } => write!(f, "Limit {count} ordering={ordering}"),
            Operator::Offset { count, ordering } => write!(f, "Offset {count} ordering={ordering}"),
            Operator::RowNumber { def } => write!(
                f,
                "RowNumber {} partition={} ordering={}",
                def.col, def.partition_by, def.ordering
            ),
            Operator::Explain { props, .. } => write!(f, "Explain ordering={}", props.ordering),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colset::cols;

    #[test]
    fn test_outer_cols() {
        let e = Expr::And(vec![
            Expr::gt(Expr::col(ColumnId(2)), Expr::int(10)),
            Expr::Function {
                name: "lower".into(),
                args: vec![Expr::col(ColumnId(5))],
            },
        ]);
        assert_eq!(e.outer_cols(), cols(&[2, 5]));
        assert!(Expr::int(1).outer_cols().is_empty());
    }

    #[test]
    fn test_substitute() {
        let e = Expr::equals(Expr::col(ColumnId(1)), Expr::col(ColumnId(2)));
        let out = e.substitute(&|c| (c == ColumnId(1)).then(|| Expr::int(7)));
        assert_eq!(out, Expr::equals(Expr::int(7), Expr::col(ColumnId(2))));
    }

    #[test]
    fn test_referenced_cols() {
        let op = Operator::GroupBy {
            kind: GroupingKind::GroupBy,
            aggregations: vec![Aggregation {
                col: ColumnId(9),
                agg: AggExpr::new(AggFunc::Sum, vec![Expr::col(ColumnId(2))]),
            }],
            grouping_cols: cols(&[1]),
            ordering: Ordering::none(),
        };
        assert_eq!(op.referenced_cols(), cols(&[1, 2]));
        assert_eq!(op.arity(), 1);
        assert_eq!(op.kind(), OpKind::GroupBy);
    }
}
