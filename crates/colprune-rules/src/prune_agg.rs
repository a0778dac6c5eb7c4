//! # Grouping Rules
//!
//! - `PruneAggCols` drops aggregations the enclosing Project does not read. Grouping
//!   columns are never dropped, they decide how rows are partitioned.
//! - `PruneGroupByCols` prunes the grouping's input down to the aggregate arguments,
//!   grouping columns and ordering. It needs no enclosing Project: the grouping
//!   consumes its input's columns itself.
//!
//! ```text
//! GroupBy{a; s := sum(b)}(Scan[a, b, c])  ->  GroupBy{a; s := sum(b)}(Scan[a, b])
//! ```

use crate::{check_prunable, projection, prune_input, PRUNE_TAGS};
use colprune_core::expr::{OpKind, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::{needed_cols_group_by, needed_cols_projection};
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

/// Project over GroupBy.
pub struct PruneAggCols;

impl Rule for PruneAggCols {
    fn name(&self) -> &str {
        "PruneAggCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::GroupBy, vec![Pattern::Any]),
        ))
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        let Some(input) = b.expr("$input") else {
            return false;
        };
        let Some((projections, passthrough)) = projection(ctx.memo, expr) else {
            return false;
        };
        let needed = needed_cols_projection(projections, passthrough);
        check_prunable(b, ctx, input, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

/// GroupBy over anything.
pub struct PruneGroupByCols;

impl Rule for PruneGroupByCols {
    fn name(&self) -> &str {
        "PruneGroupByCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::op(OpKind::GroupBy, vec![Pattern::any("$input")])
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        let Some(input) = b.expr("$input") else {
            return false;
        };
        let Operator::GroupBy {
            aggregations,
            grouping_cols,
            ordering,
            ..
        } = &ctx.memo.expr(expr).op
        else {
            return false;
        };
        let needed = needed_cols_group_by(aggregations, grouping_cols, ordering);
        check_prunable(b, ctx, input, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}
