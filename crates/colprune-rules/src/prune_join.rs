//! # Join Side Pruning
//!
//! The two sides of a join are pruned by separate rules because each side's needed
//! columns differ, and either side, both or neither may be prunable. A side keeps what
//! the enclosing Project reads, the other side's entire output and every column of the
//! join predicate, so join keys survive even when nothing above reads them:
//!
//! ```text
//! Project{b, d}(Join[a = c](Scan[a, b, e], Scan[c, d, f]))
//!   -> Project{b, d}(Join[a = c](Scan[a, b], Scan[c, d, f]))   PruneJoinLeftCols
//!   -> Project{b, d}(Join[a = c](Scan[a, b], Scan[c, d]))      PruneJoinRightCols
//! ```
//!
//! The replacement rebuilds the same join variant over the new side.
//!
//! Semi and anti joins never output their right side, so its needs come from the
//! predicate alone and `PruneSemiAntiJoinRightCols` needs no enclosing Project.

use crate::{check_prunable, projection, PRUNE_TAGS};
use colprune_core::expr::{JoinType, Operator};
use colprune_core::memo::ExprId;
use colprune_core::needed::{needed_cols_join_side, needed_cols_semi_join_right};
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

const ALL_JOINS: &[JoinType] = &[
    JoinType::Inner,
    JoinType::Left,
    JoinType::Right,
    JoinType::Full,
    JoinType::Semi,
    JoinType::Anti,
    JoinType::Cross,
];

/// Joins whose output includes the right side.
const RIGHT_OUTPUT_JOINS: &[JoinType] = &[
    JoinType::Inner,
    JoinType::Left,
    JoinType::Right,
    JoinType::Full,
    JoinType::Cross,
];

fn project_over_join(types: &[JoinType]) -> Pattern {
    Pattern::project(Pattern::capture(
        "$input",
        Pattern::join(types, Pattern::any("$left"), Pattern::any("$right")),
    ))
}

/// Compute the needs of `side` given the other side, and bind them if it can be pruned.
fn join_side_condition(
    expr: ExprId,
    b: &mut Bindings,
    ctx: &mut OptContext,
    side: &str,
    other: &str,
) -> bool {
    let (Some(input), Some(side), Some(other)) = (b.expr("$input"), b.expr(side), b.expr(other))
    else {
        return false;
    };
    let Some((projections, passthrough)) = projection(ctx.memo, expr) else {
        return false;
    };
    let Operator::Join { on, .. } = &ctx.memo.expr(input).op else {
        return false;
    };
    let needed = needed_cols_join_side(projections, passthrough, ctx.memo.output_cols(other), on);
    check_prunable(b, ctx, side, needed)
}

/// Prune one side of `$input` and rebuild the join and the Project above it.
fn replace_join_side(
    expr: ExprId,
    b: &Bindings,
    ctx: &mut OptContext,
    prune_left: bool,
) -> Option<ExprId> {
    let input = b.expr("$input")?;
    let left = b.expr("$left")?;
    let right = b.expr("$right")?;
    let needed = b.cols("$needed")?.clone();
    let children = if prune_left {
        vec![ctx.prune_cols(left, &needed), right]
    } else {
        vec![left, ctx.prune_cols(right, &needed)]
    };
    let join = ctx.memo.rebuild(input, children);
    Some(ctx.memo.rebuild(expr, vec![join]))
}

/// Project over any join: prune the left input.
pub struct PruneJoinLeftCols;

impl Rule for PruneJoinLeftCols {
    fn name(&self) -> &str {
        "PruneJoinLeftCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        project_over_join(ALL_JOINS)
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$left", "$right", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        join_side_condition(expr, b, ctx, "$left", "$right")
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        replace_join_side(expr, b, ctx, true)
    }
}

/// Project over a join that outputs its right side: prune the right input.
pub struct PruneJoinRightCols;

impl Rule for PruneJoinRightCols {
    fn name(&self) -> &str {
        "PruneJoinRightCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        project_over_join(RIGHT_OUTPUT_JOINS)
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$left", "$right", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        join_side_condition(expr, b, ctx, "$right", "$left")
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        replace_join_side(expr, b, ctx, false)
    }
}

/// Semi or anti join: the right input only keeps what the predicate reads.
pub struct PruneSemiAntiJoinRightCols;

impl Rule for PruneSemiAntiJoinRightCols {
    fn name(&self) -> &str {
        "PruneSemiAntiJoinRightCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::join(
            &[JoinType::Semi, JoinType::Anti],
            Pattern::any("$left"),
            Pattern::any("$right"),
        )
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$left", "$right", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        let Some(right) = b.expr("$right") else {
            return false;
        };
        let Operator::Join { on, .. } = &ctx.memo.expr(expr).op else {
            return false;
        };
        let needed = needed_cols_semi_join_right(on);
        check_prunable(b, ctx, right, needed)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        let left = b.expr("$left")?;
        let right = b.expr("$right")?;
        let needed = b.cols("$needed")?.clone();
        let right = ctx.prune_cols(right, &needed);
        Some(ctx.memo.rebuild(expr, vec![left, right]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{apply, c, keep, scan};
    use colprune_core::colset::cols;
    use colprune_core::expr::Expr;
    use colprune_core::memo::Memo;

    fn join(memo: &mut Memo, join_type: JoinType, on: Expr, l: ExprId, r: ExprId) -> ExprId {
        memo.add_expr(Operator::Join { join_type, on }, vec![l, r])
    }

    #[test]
    fn test_each_side_keeps_its_key() {
        let mut memo = Memo::new();
        let l = scan(&mut memo, 1, &[1, 2, 5]);
        let r = scan(&mut memo, 2, &[3, 4, 6]);
        let j = join(&mut memo, JoinType::Inner, Expr::equals(c(1), c(3)), l, r);
        let p = keep(&mut memo, &[2, 4], j);

        let after_left = apply(&PruneJoinLeftCols, &mut memo, p).unwrap();
        let j1 = memo.expr(after_left).children[0];
        assert_eq!(memo.output_cols(memo.expr(j1).children[0]), &cols(&[1, 2]));
        assert_eq!(memo.expr(j1).children[1], r);
        assert!(apply(&PruneJoinLeftCols, &mut memo, after_left).is_none());

        let after_right = apply(&PruneJoinRightCols, &mut memo, after_left).unwrap();
        let j2 = memo.expr(after_right).children[0];
        assert_eq!(memo.output_cols(memo.expr(j2).children[1]), &cols(&[3, 4]));
        assert_eq!(memo.expr(j2).op, memo.expr(j).op);
    }

    #[test]
    fn test_right_rule_skips_semi_join() {
        let mut memo = Memo::new();
        let l = scan(&mut memo, 1, &[1, 2]);
        let r = scan(&mut memo, 2, &[3, 4]);
        let j = join(&mut memo, JoinType::Semi, Expr::equals(c(1), c(3)), l, r);
        let p = keep(&mut memo, &[1], j);
        assert!(apply(&PruneJoinRightCols, &mut memo, p).is_none());

        let out = apply(&PruneSemiAntiJoinRightCols, &mut memo, j).unwrap();
        assert_eq!(memo.output_cols(memo.expr(out).children[1]), &cols(&[3]));
        assert_eq!(memo.output_cols(out), &cols(&[1, 2]));
    }

    #[test]
    fn test_anti_join_without_key_keeps_stand_in() {
        let mut memo = Memo::new();
        let l = scan(&mut memo, 1, &[1]);
        let r = scan(&mut memo, 2, &[3, 4]);
        let j = join(&mut memo, JoinType::Anti, Expr::bool(true), l, r);
        let out = apply(&PruneSemiAntiJoinRightCols, &mut memo, j).unwrap();
        assert_eq!(memo.output_cols(memo.expr(out).children[1]), &cols(&[3]));
        assert!(apply(&PruneSemiAntiJoinRightCols, &mut memo, out).is_none());
    }
}
