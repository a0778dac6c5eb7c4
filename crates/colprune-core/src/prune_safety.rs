//! # Prune-Safety Property
//!
//! For every expression, the set of output columns that can be removed by pushing a
//! narrower column list into it without the push getting stuck. A column is safe when
//! the pruning recursion is guaranteed to reach an operator that absorbs the narrower
//! list itself:
//!
//! - `Scan`, `Values` and `Project` filter their own columns, so all their outputs are
//!   safe.
//! - `GroupBy` can drop aggregations but never grouping columns.
//! - Pass-through operators (`Select`, `Limit`, `Offset`, `RowNumber`, the sides of a
//!   `Join`) inherit their input's safe set minus the columns they read themselves.
//! - `Explain` has no safe columns: its outputs are not its input's.
//!
//! When a pass-through operator can be forced to keep a stand-in column of its input
//! (nothing it reads comes from that input), the input's smallest column is excluded
//! too. With that exclusion, [`SafetyCache::can_prune_cols`] returning `true` means
//! that [`prune_cols`](crate::prune::prune_cols) will remove at least one column.
//!
//! The derivation sits behind the [`PruneSafety`] trait so a different one can be
//! injected per normalizer. Results are memoized per [`ExprId`] for one run.

use crate::colset::ColSet;
use crate::expr::Operator;
use crate::memo::{ExprId, Memo};
use std::collections::HashMap;
use std::sync::Arc;

/// Derivation of the prune-safe columns of one expression.
pub trait PruneSafety: Send + Sync {
    /// Derive the safe set of `id` given the safe sets of its children, in order.
    fn derive(&self, memo: &Memo, id: ExprId, children: &[ColSet]) -> ColSet;
}

/// The standard derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPruneSafety;

impl PruneSafety for DefaultPruneSafety {
    fn derive(&self, memo: &Memo, id: ExprId, children: &[ColSet]) -> ColSet {
        let expr = memo.expr(id);
        let child = |i: usize| children.get(i).cloned().unwrap_or_default();
        let child_out = |i: usize| {
            expr.children
                .get(i)
                .map(|&c| memo.output_cols(c).clone())
                .unwrap_or_default()
        };

        match &expr.op {
            Operator::Scan { .. } | Operator::Values { .. } | Operator::Project { .. } => {
                expr.props.output_cols.clone()
            }
            Operator::GroupBy { aggregations, .. } => {
                aggregations.iter().map(|a| a.col).collect()
            }
            Operator::Select { filter } => child(0).difference(&filter.outer_cols()),
            Operator::Limit { ordering, .. } | Operator::Offset { ordering, .. } => {
                child(0).difference(&ordering.cols())
            }
            Operator::Join { join_type, on } => {
                let on_cols = on.outer_cols();
                let left = without_stand_in(child(0), &child_out(0), &on_cols);
                let mut safe = left.difference(&on_cols);
                if join_type.outputs_right() {
                    let right = without_stand_in(child(1), &child_out(1), &on_cols);
                    safe.union_with(&right.difference(&on_cols));
                }
                safe
            }
            Operator::RowNumber { def } => {
                let refs = def.input_cols();
                without_stand_in(child(0), &child_out(0), &refs).difference(&refs)
            }
            Operator::Explain { .. } => ColSet::new(),
        }
    }
}

/// Drop the input's stand-in column from `safe` when `refs` reads nothing of the input.
fn without_stand_in(mut safe: ColSet, input_cols: &ColSet, refs: &ColSet) -> ColSet {
    if !refs.intersects(input_cols) {
        if let Some(first) = input_cols.first() {
            safe.remove(first);
        }
    }
    safe
}

/// Per-run memo of the prune-safety property.
pub struct SafetyCache {
    safety: Arc<dyn PruneSafety>,
    cache: HashMap<ExprId, ColSet>,
}

impl SafetyCache {
    pub fn new(safety: Arc<dyn PruneSafety>) -> Self {
        Self {
            safety,
            cache: HashMap::new(),
        }
    }

    /// The safe set of `id`, always a subset of its output columns.
    pub fn safe_cols(&mut self, memo: &Memo, id: ExprId) -> ColSet {
        if let Some(cols) = self.cache.get(&id) {
            return cols.clone();
        }
        let children: Vec<ColSet> = memo
            .expr(id)
            .children
            .clone()
            .into_iter()
            .map(|c| self.safe_cols(memo, c))
            .collect();
        let safe = self
            .safety
            .derive(memo, id, &children)
            .intersection(memo.output_cols(id));
        self.cache.insert(id, safe.clone());
        safe
    }

    /// Whether `id` has an output column outside `needed` that is also safe to prune.
    pub fn can_prune_cols(&mut self, memo: &Memo, id: ExprId, needed: &ColSet) -> bool {
        let unused = memo.output_cols(id).difference(needed);
        if unused.is_empty() {
            return false;
        }
        unused.intersects(&self.safe_cols(memo, id))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
