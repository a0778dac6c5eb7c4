//! # Built-in Column-Pruning Rules
//!
//! This crate provides the default rule catalog for the normalizer. Rules are
//! registered in priority order; when two rules match the same expression the one
//! registered first wins.
//!
//! ## Pruning Rules (`Normalize`, `DetectCycle`)
//!
//! Each matches an operator whose input produces columns nobody reads, computes the
//! needed columns for that input, guards with `can_prune_cols`, and replaces the input
//! with a narrower version of itself. The outer operator is left untouched.
//!
//! - **`PruneProjectCols`**, **`PruneScanCols`**: Project over Project / Scan.
//! - **`PruneSelectCols`**: Project over Select; filter columns are kept.
//! - **`PruneLimitCols`**, **`PruneOffsetCols`**: Project over Limit / Offset; ordering
//!   columns are kept.
//! - **`PruneJoinLeftCols`**, **`PruneJoinRightCols`**: Project over Join, one side at a
//!   time; the other side's output and the predicate's columns are kept.
//! - **`PruneSemiAntiJoinRightCols`**: the right input of a semi or anti join only needs
//!   the predicate's columns, no enclosing Project required.
//! - **`PruneAggCols`**: Project over GroupBy; drops unread aggregations.
//! - **`PruneGroupByCols`**: GroupBy over anything; the input keeps aggregate arguments,
//!   grouping columns and the ordering.
//! - **`PruneValuesCols`**: Project over Values.
//! - **`PruneRowNumberCols`**: Project over RowNumber; partition and ordering columns
//!   are kept.
//! - **`PruneExplainCols`**: Explain over anything; the input keeps the columns its
//!   required presentation and ordering reference.
//!
//! ## Project Simplification (`Normalize`)
//!
//! - **`MergeProjects`**: folds a Project into the Project above it.
//! - **`EliminateProject`**: removes a Project that passes its input through unchanged.

pub mod project;
pub mod prune_agg;
pub mod prune_explain;
pub mod prune_filtering;
pub mod prune_join;
pub mod prune_limit;
pub mod prune_row_number;
pub mod prune_select;

use colprune_core::colset::ColSet;
use colprune_core::expr::{Operator, ProjectionItem};
use colprune_core::memo::{ExprId, Memo};
use colprune_core::needed::with_stand_in;
use colprune_core::pattern::Bindings;
use colprune_core::rule::{OptContext, RuleRegistry, RuleTag};

/// Tags shared by all pruning rules.
pub const PRUNE_TAGS: &[RuleTag] = &[RuleTag::Normalize, RuleTag::DetectCycle];

/// Create a rule registry with all built-in rules, in priority order.
pub fn default_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    // Pruning rules.
    registry.add_rule(Box::new(prune_filtering::PruneProjectCols));
    registry.add_rule(Box::new(prune_filtering::PruneScanCols));
    registry.add_rule(Box::new(prune_select::PruneSelectCols));
    registry.add_rule(Box::new(prune_limit::PruneLimitCols));
    registry.add_rule(Box::new(prune_limit::PruneOffsetCols));
    registry.add_rule(Box::new(prune_join::PruneJoinLeftCols));
    registry.add_rule(Box::new(prune_join::PruneJoinRightCols));
    registry.add_rule(Box::new(prune_join::PruneSemiAntiJoinRightCols));
    registry.add_rule(Box::new(prune_agg::PruneAggCols));
    registry.add_rule(Box::new(prune_agg::PruneGroupByCols));
    registry.add_rule(Box::new(prune_filtering::PruneValuesCols));
    registry.add_rule(Box::new(prune_row_number::PruneRowNumberCols));
    registry.add_rule(Box::new(prune_explain::PruneExplainCols));

    // Project simplification, after pruning has had its chance.
    registry.add_rule(Box::new(project::MergeProjects));
    registry.add_rule(Box::new(project::EliminateProject));

    registry
}

/// The projection list and passthrough set of a `Project` expression.
pub(crate) fn projection(memo: &Memo, id: ExprId) -> Option<(&[ProjectionItem], &ColSet)> {
    match &memo.expr(id).op {
        Operator::Project {
            projections,
            passthrough,
        } => Some((projections.as_slice(), passthrough)),
        _ => None,
    }
}

/// Apply the stand-in policy to `needed`, check that `target` can be pruned to it and
/// bind the result as `$needed`.
pub(crate) fn check_prunable(
    b: &mut Bindings,
    ctx: &mut OptContext,
    target: ExprId,
    needed: ColSet,
) -> bool {
    let needed = with_stand_in(&needed, ctx.memo.output_cols(target));
    if !ctx.can_prune_cols(target, &needed) {
        return false;
    }
    b.bind_cols("$needed", needed);
    true
}

/// Replace the single child of `expr` (captured as `$input`) with its pruned form.
pub(crate) fn prune_input(expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
    let input = b.expr("$input")?;
    let needed = b.cols("$needed")?.clone();
    let pruned = ctx.prune_cols(input, &needed);
    Some(ctx.memo.rebuild(expr, vec![pruned]))
}
