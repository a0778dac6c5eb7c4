//! Pruning through RowNumber: the input keeps what the Project reads plus the
//! partition and ordering columns the numbering depends on.

use crate::{check_prunable, projection, prune_input, PRUNE_TAGS};
use colprune_core::expr::{OpKind, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::needed_cols_row_number;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

pub struct PruneRowNumberCols;

impl Rule for PruneRowNumberCols {
    fn name(&self) -> &str {
        "PruneRowNumberCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::RowNumber, vec![Pattern::Any]),
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
        let Operator::RowNumber { def } = &ctx.memo.expr(input).op else {
            return false;
        };
        let needed = needed_cols_row_number(projections, passthrough, def);
        check_prunable(b, ctx, input, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}
