//! # Project Simplification
//!
//! Pruning leaves the enclosing Project of every rewrite in place, so chains of
//! Projects and Projects that no longer rename or compute anything pile up. These two
//! rules clean them up once pruning has had its chance:
//!
//! ```text
//! Project{x}(Project{x := a}(Scan[a]))  ->  Project{x := a}(Scan[a])   MergeProjects
//! Project{a, b}(Scan[a, b])             ->  Scan[a, b]                 EliminateProject
//! ```
//!
//! Both keep the output columns of the expression they rewrite.

use crate::projection;
use colprune_core::colset::{ColSet, ColumnId};
use colprune_core::expr::{Expr, OpKind, Operator, ProjectionItem};
use colprune_core::memo::ExprId;
use colprune_core::pattern::{Bindings, Pattern};
use colprune_core::rule::{OptContext, Rule};
use std::collections::HashMap;

/// Fold a Project into the Project above it by inlining the inner expressions.
///
/// Inner expressions that compute something are only inlined when at most one outer
/// output reads them, so merging never duplicates work.
pub struct MergeProjects;

impl Rule for MergeProjects {
    fn name(&self) -> &str {
        "MergeProjects"
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::capture(
            "$input",
            Pattern::op(OpKind::Project, vec![Pattern::any("$inner")]),
        ))
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input", "$inner"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        let Some(input) = b.expr("$input") else {
            return false;
        };
        let (Some((outer, outer_pass)), Some((inner, _))) =
            (projection(ctx.memo, expr), projection(ctx.memo, input))
        else {
            return false;
        };

        let mut readers: HashMap<ColumnId, usize> = HashMap::new();
        for p in outer {
            for c in p.expr.outer_cols().iter() {
                *readers.entry(c).or_default() += 1;
            }
        }
        for c in outer_pass.iter() {
            *readers.entry(c).or_default() += 1;
        }
        inner.iter().all(|item| {
            matches!(item.expr, Expr::Column(_) | Expr::Literal(_))
                || readers.get(&item.col).copied().unwrap_or(0) <= 1
        })
    }

    fn replace(&self, expr: ExprId, b: &Bindings, ctx: &mut OptContext) -> Option<ExprId> {
        let input = b.expr("$input")?;
        let inner_input = b.expr("$inner")?;
        let (outer, outer_pass) = projection(ctx.memo, expr)?;
        let (inner, _) = projection(ctx.memo, input)?;

        let defs: HashMap<ColumnId, &Expr> = inner.iter().map(|p| (p.col, &p.expr)).collect();
        let mut projections: Vec<ProjectionItem> = outer
            .iter()
            .map(|p| {
                let expr = p.expr.substitute(&|c| defs.get(&c).map(|e| (*e).clone()));
                ProjectionItem::new(p.col, expr)
            })
            .collect();
        let mut passthrough = ColSet::new();
        for c in outer_pass.iter() {
            match defs.get(&c) {
                Some(e) => projections.push(ProjectionItem::new(c, (*e).clone())),
                None => {
                    passthrough.insert(c);
                }
            }
        }

        let op = Operator::Project {
            projections,
            passthrough,
        };
        Some(ctx.memo.add_expr(op, vec![inner_input]))
    }
}

/// Remove a Project that passes exactly its input's columns through.
pub struct EliminateProject;

impl Rule for EliminateProject {
    fn name(&self) -> &str {
        "EliminateProject"
    }

    fn pattern(&self) -> Pattern {
        Pattern::project(Pattern::any("$input"))
    }

    fn reads(&self) -> &'static [&'static str] {
        &["$input"]
    }

    fn condition(&self, expr: ExprId, b: &mut Bindings, ctx: &mut OptContext) -> bool {
        let Some(input) = b.expr("$input") else {
            return false;
        };
        match projection(ctx.memo, expr) {
            Some((projections, passthrough)) => {
                projections.is_empty() && passthrough == ctx.memo.output_cols(input)
            }
            None => false,
        }
    }

    fn replace(&self, _expr: ExprId, b: &Bindings, _ctx: &mut OptContext) -> Option<ExprId> {
        b.expr("$input")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{apply, c, keep, project, scan};
    use colprune_core::colset::cols;
    use colprune_core::expr::BinaryOp;
    use colprune_core::memo::Memo;

    #[test]
    fn test_merge_inlines_inner_expressions() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let inner = project(&mut memo, vec![(4, c(1))], s);
        let outer = keep(&mut memo, &[4], inner);
        let merged = apply(&MergeProjects, &mut memo, outer).unwrap();
        assert_eq!(
            memo.expr(merged).op,
            Operator::Project {
                projections: vec![ProjectionItem::new(ColumnId(4), c(1))],
                passthrough: ColSet::new(),
            }
        );
        assert_eq!(memo.expr(merged).children, vec![s]);
        assert_eq!(memo.output_cols(merged), memo.output_cols(outer));
    }

    #[test]
    fn test_merge_substitutes_into_outer_expressions() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let sum = Expr::binary(BinaryOp::Add, c(1), c(2));
        let inner = memo.add_expr(
            Operator::Project {
                projections: vec![ProjectionItem::new(ColumnId(4), sum.clone())],
                passthrough: cols(&[2]),
            },
            vec![s],
        );
        let outer = memo.add_expr(
            Operator::Project {
                projections: vec![ProjectionItem::new(
                    ColumnId(5),
                    Expr::gt(c(4), c(2)),
                )],
                passthrough: cols(&[2]),
            },
            vec![inner],
        );
        let merged = apply(&MergeProjects, &mut memo, outer).unwrap();
        assert_eq!(
            memo.expr(merged).op,
            Operator::Project {
                projections: vec![ProjectionItem::new(ColumnId(5), Expr::gt(sum, c(2)))],
                passthrough: cols(&[2]),
            }
        );
    }

    #[test]
    fn test_merge_refuses_to_duplicate_work() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let inner = project(&mut memo, vec![(4, Expr::binary(BinaryOp::Mul, c(1), c(2)))], s);
        let outer = project(
            &mut memo,
            vec![(5, Expr::gt(c(4), Expr::int(0))), (6, Expr::gt(c(4), Expr::int(9)))],
            inner,
        );
        assert!(apply(&MergeProjects, &mut memo, outer).is_none());
    }

    #[test]
    fn test_eliminate_identity_project() {
        let mut memo = Memo::new();
        let s = scan(&mut memo, 1, &[1, 2]);
        let identity = keep(&mut memo, &[1, 2], s);
        assert_eq!(apply(&EliminateProject, &mut memo, identity), Some(s));

        let narrowing = keep(&mut memo, &[1], s);
        assert!(apply(&EliminateProject, &mut memo, narrowing).is_none());
    }
}
