//! # Pruning Through Limit and Offset
//!
//! Both operators cut rows under an ordering, so the input keeps the ordering's columns
//! on top of what the enclosing Project reads. The ordering itself is re-derived
//! against the narrower input by `prune_cols`.

use crate::{check_prunable, projection, prune_input, PRUNE_TAGS};
use colprune_core::expr::{OpKind, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::needed_cols_ordered;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

fn ordered_condition(expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
    let Some(input) = b.expr("$input") else {
        return false;
    };
    let Some((projections, passthrough)) = projection(ctx.memo, expr) else {
        return false;
    };
    let ordering = match &ctx.memo.expr(input).op {
        Operator::Limit { ordering, .. } | Operator::Offset { ordering, .. } => ordering,
        _ => return false,
    };
    let needed = needed_cols_ordered(projections, passthrough, ordering);
    check_prunable(b, ctx, input, needed)
}

/// Project over Limit.
pub struct PruneLimitCols;

impl Rule for PruneLimitCols {
    fn name(&self) -> &str {
        "PruneLimitCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::Limit, vec![Pattern::Any]),
        ))
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        ordered_condition(expr, b, ctx)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

/// Project over Offset.
pub struct PruneOffsetCols;

impl Rule for PruneOffsetCols {
    fn name(&self) -> &str {
        "PruneOffsetCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::Offset, vec![Pattern::Any]),
        ))
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        ordered_condition(expr, b, ctx)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{apply, keep, scan};
    use colprune_core::colset::{cols, ColumnId};
    use colprune_core::expr::Ordering;
    use colprune_core::memo::Memo;

    #[test]
    fn test_limit_keeps_ordering_column() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2, 3]);
        let limit = memo.add_expr(
            Operator::Limit {
                count: 5,
                ordering: Ordering::asc(&[ColumnId(3)]),
            },
            vec![s],
        );
        let p = keep(&mut memo, &[1], limit);
        let out = apply(&PruneLimitCols, &mut memo, p).unwrap();
        let new_limit = memo.expr(out).children[0];
        assert_eq!(memo.output_cols(new_limit), &cols(&[1, 3]));
        assert_eq!(
            memo.expr(new_limit).op,
            Operator::Limit {
                count: 5,
                ordering: Ordering::asc(&[ColumnId(3)]),
            }
        );
        assert!(apply(&PruneOffsetCols, &mut memo, p).is_none());
    }

    #[test]
    fn test_offset_without_ordering() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let offset = memo.add_expr(
            Operator::Offset {
                count: 2,
                ordering: Ordering::none(),
            },
            vec![s],
        );
        let p = keep(&mut memo, &[2], offset);
        let out = apply(&PruneOffsetCols, &mut memo, p).unwrap();
        let new_offset = memo.expr(out).children[0];
        assert_eq!(memo.output_cols(new_offset), &cols(&[2]));
    }
}
