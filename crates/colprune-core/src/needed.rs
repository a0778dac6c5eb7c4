//! # Needed-Columns Analysis
//!
//! One pure function per consumer context. Each takes the locally visible consumers of
//! a candidate input (the enclosing projection, a filter, a join predicate, an
//! ordering, ...) and returns the set of columns that input must keep.
//!
//! The results can be empty: a projection of literals needs no input column at all.
//! An input still has to produce at least one column so that its row count survives,
//! which is what [`with_stand_in`] restores before a set is handed to pruning.

use crate::colset::ColSet;
use crate::expr::{Aggregation, Expr, Ordering, ProjectionItem, RowNumberDef};
use crate::properties::PhysicalProps;

/// Add a stand-in column when `needed` keeps nothing of `input_cols`.
///
/// The stand-in is the smallest column id of the input, so the choice is stable
/// across runs.
pub fn with_stand_in(needed: &ColSet, input_cols: &ColSet) -> ColSet {
    let mut out = needed.clone();
    if !needed.intersects(input_cols) {
        if let Some(first) = input_cols.first() {
            out.insert(first);
        }
    }
    out
}

/// Columns a projection reads from its input.
pub fn needed_cols_projection(projections: &[ProjectionItem], passthrough: &ColSet) -> ColSet {
    let mut out = passthrough.clone();
    for p in projections {
        out.union_with(&p.expr.outer_cols());
    }
    out
}

/// Projection plus the filter that sits between it and the input.
pub fn needed_cols_select(
    projections: &[ProjectionItem],
    passthrough: &ColSet,
    filter: &Expr,
) -> ColSet {
    let mut out = needed_cols_projection(projections, passthrough);
    out.union_with(&filter.outer_cols());
    out
}

/// Columns one side of a join must keep.
///
/// The other side's whole output is included along with the predicate's columns, so
/// that the join key of this side always survives.
pub fn needed_cols_join_side(
    projections: &[ProjectionItem],
    passthrough: &ColSet,
    other_side: &ColSet,
    on: &Expr,
) -> ColSet {
    let mut out = needed_cols_projection(projections, passthrough);
    out.union_with(other_side);
    out.union_with(&on.outer_cols());
    out
}

/// The right side of a semi or anti join is only ever read by the predicate.
pub fn needed_cols_semi_join_right(on: &Expr) -> ColSet {
    on.outer_cols()
}

/// Projection above a `Limit` or `Offset`, plus the ordering the row cut depends on.
pub fn needed_cols_ordered(
    projections: &[ProjectionItem],
    passthrough: &ColSet,
    ordering: &Ordering,
) -> ColSet {
    let mut out = needed_cols_projection(projections, passthrough);
    out.union_with(&ordering.cols());
    out
}

/// Input columns of a grouping: aggregate arguments, grouping columns and ordering.
///
/// Grouping columns are always included because they decide how rows are partitioned.
pub fn needed_cols_group_by(
    aggregations: &[Aggregation],
    grouping_cols: &ColSet,
    ordering: &Ordering,
) -> ColSet {
    let mut out = grouping_cols.union(&ordering.cols());
    for a in aggregations {
        out.union_with(&a.input_cols());
    }
    out
}

pub fn needed_cols_row_number(
    projections: &[ProjectionItem],
    passthrough: &ColSet,
    def: &RowNumberDef,
) -> ColSet {
    let mut out = needed_cols_projection(projections, passthrough);
    out.union_with(&def.input_cols());
    out
}

/// Columns the explained statement's required presentation and ordering reference.
pub fn needed_cols_explain(props: &PhysicalProps) -> ColSet {
    props.cols()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colset::{cols, ColumnId};
    use crate::expr::{AggExpr, AggFunc};

    fn c(id: u32) -> Expr {
        Expr::col(ColumnId(id))
    }

    #[test]
    fn test_stand_in() {
        assert_eq!(with_stand_in(&cols(&[]), &cols(&[4, 2, 7])), cols(&[2]));
        assert_eq!(with_stand_in(&cols(&[9]), &cols(&[4, 2])), cols(&[2, 9]));
        assert_eq!(with_stand_in(&cols(&[4]), &cols(&[4, 2])), cols(&[4]));
        assert!(with_stand_in(&cols(&[]), &cols(&[])).is_empty());
    }

    #[test]
    fn test_projection_contexts() {
        let projections = vec![ProjectionItem::new(ColumnId(10), c(1))];
        let passthrough = cols(&[2]);
        assert_eq!(needed_cols_projection(&projections, &passthrough), cols(&[1, 2]));
        assert_eq!(
            needed_cols_select(&projections, &passthrough, &Expr::gt(c(3), Expr::int(1))),
            cols(&[1, 2, 3])
        );
        assert_eq!(
            needed_cols_ordered(&projections, &passthrough, &Ordering::asc(&[ColumnId(5)])),
            cols(&[1, 2, 5])
        );
        assert!(needed_cols_projection(
            &[ProjectionItem::new(ColumnId(10), Expr::int(1))],
            &ColSet::new()
        )
        .is_empty());
    }

    #[test]
    fn test_join_side_keeps_key() {
        let on = Expr::equals(c(1), c(3));
        let needed = needed_cols_join_side(&[], &cols(&[2]), &cols(&[3, 4]), &on);
        assert_eq!(needed, cols(&[1, 2, 3, 4]));
        assert_eq!(needed_cols_semi_join_right(&on), cols(&[1, 3]));
    }

    #[test]
    fn test_group_by_and_row_number() {
        let aggs = vec![Aggregation {
            col: ColumnId(20),
            agg: AggExpr::new(AggFunc::Sum, vec![c(2)]),
        }];
        assert_eq!(
            needed_cols_group_by(&aggs, &cols(&[1]), &Ordering::none()),
            cols(&[1, 2])
        );
        let def = RowNumberDef {
            col: ColumnId(30),
            partition_by: cols(&[4]),
            ordering: Ordering::asc(&[ColumnId(5)]),
        };
        assert_eq!(
            needed_cols_row_number(&[], &cols(&[30]), &def),
            cols(&[4, 5, 30])
        );
    }

    #[test]
    fn test_explain() {
        let props = PhysicalProps::with_presentation(vec![ColumnId(2)])
            .with_ordering(Ordering::asc(&[ColumnId(1)]));
        assert_eq!(needed_cols_explain(&props), cols(&[1, 2]));
    }
}
