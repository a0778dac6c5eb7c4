//! # Pruning Through Select
//!
//! A Select passes its input's columns through, so a Project above it can prune the
//! Select's input as long as the filter keeps every column it reads:
//!
//! ```text
//! Project{a}(Select[b > 10](Scan[a, b, c]))  ->  Project{a}(Select[b > 10](Scan[a, b]))
//! ```

use crate::{check_prunable, projection, prune_input, PRUNE_TAGS};
use colprune_core::expr::{OpKind, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::needed_cols_select;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

pub struct PruneSelectCols;

impl Rule for PruneSelectCols {
    fn name(&self) -> &str {
        "PruneSelectCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::Select, vec![Pattern::Any]),
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
        let Operator::Select { filter } = &ctx.memo.expr(input).op else {
            return false;
        };
        let needed = needed_cols_select(projections, passthrough, filter);
        check_prunable(b, ctx, input, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{apply, c, keep, scan};
    use colprune_core::colset::cols;
    use colprune_core::expr::Expr;
    use colprune_core::memo::Memo;

    #[test]
    fn test_filter_column_survives() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2, 3]);
        let sel = memo.add_expr(
            Operator::Select {
                filter: Expr::gt(c(2), Expr::int(10)),
            },
            vec![s],
        );
        let p = keep(&mut memo, &[1], sel);
        let out = apply(&PruneSelectCols, &mut memo, p).unwrap();
        let new_sel = memo.expr(out).children[0];
        let new_scan = memo.expr(new_sel).children[0];
        assert_eq!(memo.output_cols(new_scan), &cols(&[1, 2]));
        assert!(apply(&PruneSelectCols, &mut memo, out).is_none());
    }

    #[test]
    fn test_nothing_to_prune() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let sel = memo.add_expr(
            Operator::Select {
                filter: Expr::gt(c(2), Expr::int(10)),
            },
            vec![s],
        );
        let p = keep(&mut memo, &[1], sel);
        assert!(apply(&PruneSelectCols, &mut memo, p).is_none());
    }
}
