//! # Physical and Logical Properties
//!
//! ## Logical Properties
//!
//! Logical properties describe *what* an expression produces. The pruning pass only
//! needs one: the set of output columns. It is derived once, bottom-up, when an
//! expression is interned in the memo, and never changes afterwards because
//! expressions are immutable.
//!
//! ## Physical Properties
//!
//! Physical properties describe requirements on how a result is delivered. Here they
//! only appear on `Explain`, which records the presentation and ordering its explained
//! statement must produce. Both reference columns by id, so they also count as
//! consumers when computing which columns the explained input needs.

use crate::colset::{ColSet, ColumnId};
use crate::expr::{Operator, Ordering};
use serde::{Deserialize, Serialize};

/// Required output properties of a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalProps {
    /// Columns the statement presents to the client, in order.
    pub presentation: Vec<ColumnId>,
    /// Required output ordering.
    pub ordering: Ordering,
}

impl PhysicalProps {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_presentation(presentation: Vec<ColumnId>) -> Self {
        Self {
            presentation,
            ordering: Ordering::none(),
        }
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Every column the requirements reference.
    pub fn cols(&self) -> ColSet {
        let mut out: ColSet = self.presentation.iter().copied().collect();
        out.union_with(&self.ordering.cols());
        out
    }
}

/// Logical properties are derived from an expression's operator and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalProps {
    /// Output columns of this expression.
    pub output_cols: ColSet,
}

impl LogicalProps {
    /// Derive the properties of `op` given the properties of its children.
    pub fn derive(op: &Operator, children: &[&LogicalProps]) -> Self {
        let child_cols = |i: usize| {
            children
                .get(i)
                .map(|p| p.output_cols.clone())
                .unwrap_or_default()
        };
        let output_cols = match op {
            Operator::Scan { cols, .. } => cols.clone(),
            Operator::Values { cols, .. } => cols.iter().copied().collect(),
            Operator::Project {
                projections,
                passthrough,
            } => {
                let mut out = passthrough.clone();
                out.extend(projections.iter().map(|p| p.col));
                out
            }
            Operator::Select { .. } | Operator::Limit { .. } | Operator::Offset { .. } => {
                child_cols(0)
            }
            Operator::Join { join_type, .. } => {
                if join_type.outputs_right() {
                    child_cols(0).union(&child_cols(1))
                } else {
                    child_cols(0)
                }
            }
            Operator::GroupBy {
                aggregations,
                grouping_cols,
                ..
            } => {
                let mut out = grouping_cols.clone();
                out.extend(aggregations.iter().map(|a| a.col));
                out
            }
            Operator::RowNumber { def } => {
                let mut out = child_cols(0);
                out.insert(def.col);
                out
            }
            Operator::Explain { cols, .. } => cols.iter().copied().collect(),
        };
        Self { output_cols }
    }
}
