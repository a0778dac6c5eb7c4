//! # Pruning Into Column-Filtering Operators
//!
//! `Scan`, `Values` and `Project` choose their own output columns, so a Project above
//! one of them can push its needs straight in: the input shrinks its own column list
//! and no further recursion is needed.
//!
//! ```text
//! Project{x := a}(Scan[a, b, c])  ->  Project{x := a}(Scan[a])
//! ```

use crate::{check_prunable, projection, prune_input, PRUNE_TAGS};
use colprune_core::expr::OpKind;
use colprune_core::memo::ExprId;
use colprune_core::needed::needed_cols_projection;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule, RuleTag};

/// Needed columns of `$input` are exactly what the enclosing Project reads.
fn projection_condition(expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
    let Some(input) = b.expr("$input") else {
        return false;
    };
    let Some((projections, passthrough)) = projection(ctx.memo, expr) else {
        return false;
    };
    let needed = needed_cols_projection(projections, passthrough);
    check_prunable(b, ctx, input, needed)
}

fn project_over(kind: OpKind) -> Pattern {
    Pattern::project(Pattern::capture("$input", Pattern::op(kind, vec![Pattern::Any])))
}

/// Project over Project.
pub struct PruneProjectCols;

impl Rule for PruneProjectCols {
    fn name(&self) -> &str {
        "PruneProjectCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        project_over(OpKind::Project)
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        projection_condition(expr, b, ctx)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

/// Project over Scan.
pub struct PruneScanCols;

impl Rule for PruneScanCols {
    fn name(&self) -> &str {
        "PruneScanCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture("$input", Pattern::op(OpKind::Scan, vec![])))
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        projection_condition(expr, b, ctx)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}

/// Project over Values. Pruning drops whole columns of the constant rows.
pub struct PruneValuesCols;

impl Rule for PruneValuesCols {
    fn name(&self) -> &str {
        "PruneValuesCols"
    }

    fn tags(&self) -> &'static [RuleTag] {
        PRUNE_TAGS
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture("$input", Pattern::op(OpKind::Values, vec![])))
    }

    fn binds(&self) -> &'static [&'static str] {
        &["$needed"]
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$needed"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        projection_condition(expr, b, ctx)
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        prune_input(expr, b, ctx)
    }
}
