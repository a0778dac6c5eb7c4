//! Pruning beneath Explain. The explained statement only has to produce the columns
//! its required presentation and ordering reference.

use crate::{check_prunable, prune_input, PRUNE_TAGS};
use colprune_core::expr::{OpKind, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::needed_cols_explain;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

pub struct PruneExplainCols;

impl Rule for PruneExplainCols {
    fn name(&self) -> &str {
        "PruneExplainCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::op(OpKind::Explain, vec![Pattern::any("$input")])
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
        let Operator::Explain { props, .. } = &ctx.memo.expr(expr).op else {
            return false;
        };
        let needed = needed_cols_explain(props);
        check_prunable(b, ctx, input, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}
