//! # Pruning Combinators
//!
//! [`prune_cols`] narrows an expression to a set of columns to keep. It is polymorphic
//! over operator kind:
//!
//! - operators that filter their own columns (`Scan`, `Values`, `Project`) shrink their
//!   column lists directly, and `GroupBy` drops aggregations nobody reads;
//! - pass-through operators recurse into their input, adding the columns they read
//!   themselves to the keep set;
//! - a `Join` recurses into each side that can be pruned, rebuilding the same join;
//! - anything else is wrapped in a passthrough `Project`.
//!
//! The result produces every column of `keep` the original produced. Column ids are
//! stable, so orderings are re-derived with [`project_ordering`] only to check that
//! their columns survived.

use crate::colset::ColSet;
use crate::expr::{Aggregation, Operator, Ordering, ProjectionItem};
use crate::memo::ExprId;
use crate::needed::with_stand_in;
use crate::rule::OptContext;
use tracing::trace;

/// Narrow `id` to the columns of `keep` (plus a stand-in if `keep` misses it entirely).
pub fn prune_cols(ctx: &mut OptContext, id: ExprId, keep: &ColSet) -> ExprId {
    let out = ctx.output_cols(id);
    let keep = with_stand_in(&keep.intersection(&out), &out);
    if out.is_subset_of(&keep) {
        return id;
    }

    let expr = ctx.memo.expr(id).clone();
    let pruned = match expr.op {
        Operator::Scan { table, cols } => {
            let op = Operator::Scan {
                table,
                cols: cols.intersection(&keep),
            };
            ctx.memo.add_expr(op, vec![])
        }
        Operator::Values { cols, rows } => {
            let positions: Vec<usize> = cols
                .iter()
                .enumerate()
                .filter(|(_, c)| keep.contains(**c))
                .map(|(i, _)| i)
                .collect();
            let op = Operator::Values {
                cols: positions.iter().map(|&i| cols[i]).collect(),
                rows: rows
                    .iter()
                    .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
                    .collect(),
            };
            ctx.memo.add_expr(op, vec![])
        }
        Operator::Project {
            projections,
            passthrough,
        } => {
            let op = Operator::Project {
                projections: prune_projections(projections, &keep),
                passthrough: passthrough.intersection(&keep),
            };
            ctx.memo.add_expr(op, expr.children)
        }
        Operator::GroupBy {
            kind,
            aggregations,
            grouping_cols,
            ordering,
        } => {
            let op = Operator::GroupBy {
                kind,
                aggregations: prune_aggregations(aggregations, &keep),
                grouping_cols,
                ordering,
            };
            ctx.memo.add_expr(op, expr.children)
        }
        Operator::Select { ref filter } => {
            let input_keep = keep.union(&filter.outer_cols());
            let input = prune_cols(ctx, expr.children[0], &input_keep);
            ctx.memo.rebuild(id, vec![input])
        }
        Operator::Limit { count, ordering } => {
            let input = prune_cols(ctx, expr.children[0], &keep.union(&ordering.cols()));
            let ordering = project_ordering(&ordering, ctx.memo.output_cols(input));
            ctx.memo.add_expr(Operator::Limit { count, ordering }, vec![input])
        }
        Operator::Offset { count, ordering } => {
            let input = prune_cols(ctx, expr.children[0], &keep.union(&ordering.cols()));
            let ordering = project_ordering(&ordering, ctx.memo.output_cols(input));
            ctx.memo.add_expr(Operator::Offset { count, ordering }, vec![input])
        }
        Operator::RowNumber { ref def } => {
            let mut input_keep = keep.union(&def.input_cols());
            input_keep.remove(def.col);
            let input = prune_cols(ctx, expr.children[0], &input_keep);
            ctx.memo.rebuild(id, vec![input])
        }
        Operator::Join { join_type, ref on } => {
            let mut side_keep = keep.union(&on.outer_cols());
            let left = prune_join_side(ctx, expr.children[0], &side_keep);
            if !join_type.outputs_right() {
                side_keep = on.outer_cols();
            }
            let right = prune_join_side(ctx, expr.children[1], &side_keep);
            ctx.memo.rebuild(id, vec![left, right])
        }
        Operator::Explain { .. } => {
            let op = Operator::Project {
                projections: vec![],
                passthrough: keep,
            };
            ctx.memo.add_expr(op, vec![id])
        }
    };
    trace!(from = id, to = pruned, "pruned columns");
    pruned
}

fn prune_join_side(ctx: &mut OptContext, side: ExprId, keep: &ColSet) -> ExprId {
    let needed = with_stand_in(keep, ctx.memo.output_cols(side));
    if ctx.can_prune_cols(side, &needed) {
        prune_cols(ctx, side, &needed)
    } else {
        side
    }
}

fn prune_projections(projections: Vec<ProjectionItem>, keep: &ColSet) -> Vec<ProjectionItem> {
    projections
        .into_iter()
        .filter(|p| keep.contains(p.col))
        .collect()
}

/// Keep only the aggregations whose result columns are in `keep`.
pub fn prune_aggregations(aggregations: Vec<Aggregation>, keep: &ColSet) -> Vec<Aggregation> {
    aggregations
        .into_iter()
        .filter(|a| keep.contains(a.col))
        .collect()
}

/// Restrict an ordering to its longest prefix whose columns are all in `cols`.
///
/// An ordering on `(a, b)` is still a valid ordering on `a` alone, but not on `b`.
pub fn project_ordering(ordering: &Ordering, cols: &ColSet) -> Ordering {
    Ordering(
        ordering
            .0
            .iter()
            .take_while(|o| cols.contains(o.col))
            .copied()
            .collect(),
    )
}
