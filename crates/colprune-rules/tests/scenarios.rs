//! End-to-end normalization tests with the default rule catalog.
//!
//! Each test builds a plan tree over tables registered in a `Metadata`, runs the
//! normalizer to fixpoint and checks the shape of the result.
//!
//! ## What These Tests Verify
//! - Pruning reaches scans through projections, filters, joins and groupings
//! - Join keys, filter columns and orderings survive even when nothing above reads them
//! - Projects left behind by pruning are merged or removed
//! - A broken prune-safety derivation is caught by cycle detection instead of looping

use colprune_core::colset::{ColSet, ColumnId};
use colprune_core::cycle::CycleKind;
use colprune_core::expr::*;
use colprune_core::memo::{ExprId, Memo, PlanNode};
use colprune_core::metadata::{Metadata, TableId};
use colprune_core::properties::PhysicalProps;
use colprune_core::prune_safety::{DefaultPruneSafety, PruneSafety};
use colprune_core::{NormalizeConfig, NormalizeError, Normalizer};
use colprune_rules::default_rule_registry;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn col(md: &Metadata, table: TableId, label: &str) -> ColumnId {
    md.table_column(table, label).unwrap()
}

fn scan(md: &Metadata, table: TableId, labels: &[&str]) -> PlanNode {
    PlanNode::leaf(Operator::Scan {
        table,
        cols: labels.iter().map(|l| col(md, table, l)).collect(),
    })
}

fn keep(cols: &[ColumnId], input: PlanNode) -> PlanNode {
    PlanNode::new(
        Operator::Project {
            projections: vec![],
            passthrough: cols.iter().copied().collect(),
        },
        vec![input],
    )
}

fn normalizer(memo: Memo) -> Normalizer {
    Normalizer::new(
        memo,
        Arc::new(default_rule_registry()),
        NormalizeConfig::default(),
    )
    .unwrap()
}

/// Insert, normalize and extract.
fn normalize(plan: &PlanNode) -> PlanNode {
    let mut memo = Memo::new();
    let root = memo.insert_plan(plan).unwrap();
    let mut n = normalizer(memo);
    let result = n.normalize(root).unwrap();
    n.memo.extract_plan(result)
}

fn scan_cols(plan: &PlanNode) -> Vec<ColSet> {
    let mut out = Vec::new();
    collect_scans(plan, &mut out);
    out
}

fn collect_scans(plan: &PlanNode, out: &mut Vec<ColSet>) {
    if let Operator::Scan { cols, .. } = &plan.op {
        out.push(cols.clone());
    }
    for child in &plan.children {
        collect_scans(child, out);
    }
}

fn set(cols: &[ColumnId]) -> ColSet {
    cols.iter().copied().collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_nested_projects_collapse_onto_narrow_scan() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, b, c) = (col(&md, t, "a"), col(&md, t, "b"), col(&md, t, "c"));
    let (x, y, z) = (md.add_column("x"), md.add_column("y"), md.add_column("z"));

    let inner = PlanNode::new(
        Operator::Project {
            projections: vec![
                ProjectionItem::new(x, Expr::col(a)),
                ProjectionItem::new(y, Expr::col(b)),
                ProjectionItem::new(z, Expr::col(c)),
            ],
            passthrough: ColSet::new(),
        },
        vec![scan(&md, t, &["a", "b", "c"])],
    );
    let result = normalize(&keep(&[x], inner));

    let expected = PlanNode::new(
        Operator::Project {
            projections: vec![ProjectionItem::new(x, Expr::col(a))],
            passthrough: ColSet::new(),
        },
        vec![scan(&md, t, &["a"])],
    );
    assert_eq!(result, expected);
}

#[test]
fn test_filter_column_is_retained_below_select() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, b) = (col(&md, t, "a"), col(&md, t, "b"));
    let filter = Expr::gt(Expr::col(b), Expr::int(10));

    let plan = keep(
        &[a],
        PlanNode::new(
            Operator::Select {
                filter: filter.clone(),
            },
            vec![scan(&md, t, &["a", "b", "c"])],
        ),
    );
    let expected = keep(
        &[a],
        PlanNode::new(Operator::Select { filter }, vec![scan(&md, t, &["a", "b"])]),
    );
    assert_eq!(normalize(&plan), expected);
}

#[test]
fn test_join_keys_are_retained() {
    let mut md = Metadata::new();
    let l = md.add_table("l", &["a", "b", "e"]);
    let r = md.add_table("r", &["c", "d", "f"]);
    let (a, b, c, d) = (col(&md, l, "a"), col(&md, l, "b"), col(&md, r, "c"), col(&md, r, "d"));
    let on = Expr::equals(Expr::col(a), Expr::col(c));

    // Nothing is prunable when only keys and projected columns are produced.
    let tight = keep(
        &[b, d],
        PlanNode::new(
            Operator::Join {
                join_type: JoinType::Inner,
                on: on.clone(),
            },
            vec![scan(&md, l, &["a", "b"]), scan(&md, r, &["c", "d"])],
        ),
    );
    assert_eq!(normalize(&tight), tight);

    let wide = keep(
        &[b, d],
        PlanNode::new(
            Operator::Join {
                join_type: JoinType::Inner,
                on,
            },
            vec![scan(&md, l, &["a", "b", "e"]), scan(&md, r, &["c", "d", "f"])],
        ),
    );
    assert_eq!(normalize(&wide), tight);
}

#[test]
fn test_group_by_prunes_scan_without_project() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, b) = (col(&md, t, "a"), col(&md, t, "b"));
    let total = md.add_column("sum_b");

    let group_by = |input| {
        PlanNode::new(
            Operator::GroupBy {
                kind: GroupingKind::GroupBy,
                aggregations: vec![Aggregation {
                    col: total,
                    agg: AggExpr::new(AggFunc::Sum, vec![Expr::col(b)]),
                }],
                grouping_cols: set(&[a]),
                ordering: Ordering::none(),
            },
            vec![input],
        )
    };
    let result = normalize(&group_by(scan(&md, t, &["a", "b", "c"])));
    assert_eq!(result, group_by(scan(&md, t, &["a", "b"])));
}

/// Reports a Select's input columns as safe even when the filter reads them.
struct FilterBlindSafety;

impl PruneSafety for FilterBlindSafety {
    fn derive(&self, memo: &Memo, id: ExprId, children: &[ColSet]) -> ColSet {
        match memo.expr(id).op {
            Operator::Select { .. } => children[0].clone(),
            _ => DefaultPruneSafety.derive(memo, id, children),
        }
    }
}

fn filter_chain(md: &mut Metadata) -> PlanNode {
    let t = md.add_table("t", &["a", "b"]);
    let (a, b) = (col(md, t, "a"), col(md, t, "b"));
    let inner = PlanNode::new(
        Operator::Select {
            filter: Expr::gt(Expr::col(b), Expr::int(1)),
        },
        vec![scan(md, t, &["a", "b"])],
    );
    let outer = PlanNode::new(
        Operator::Select {
            filter: Expr::gt(Expr::col(a), Expr::int(1)),
        },
        vec![inner],
    );
    keep(&[a], outer)
}

#[test]
fn test_broken_safety_is_caught_as_cycle() {
    let mut md = Metadata::new();
    let plan = filter_chain(&mut md);
    let mut memo = Memo::new();
    let root = memo.insert_plan(&plan).unwrap();
    let mut n = normalizer(memo).with_prune_safety(Arc::new(FilterBlindSafety));

    let err = n.normalize(root).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::CycleDetected {
            rule: "PruneSelectCols".into(),
            expr: root,
            kind: CycleKind::NoProgress,
        }
    );
}

#[test]
fn test_broken_safety_without_detection_stops_at_budget() {
    let mut md = Metadata::new();
    let plan = filter_chain(&mut md);
    let mut memo = Memo::new();
    let root = memo.insert_plan(&plan).unwrap();
    let config = NormalizeConfig {
        max_iterations: 50,
        detect_cycles: false,
    };
    let mut n = Normalizer::new(memo, Arc::new(default_rule_registry()), config)
        .unwrap()
        .with_prune_safety(Arc::new(FilterBlindSafety));

    assert_eq!(n.normalize(root).unwrap(), root);
    assert_eq!(n.iterations(), 50);
}

#[test]
fn test_default_safety_leaves_filter_chain_alone() {
    let mut md = Metadata::new();
    let plan = filter_chain(&mut md);
    assert_eq!(normalize(&plan), plan);
}

// ---------------------------------------------------------------------------
// Per-operator cases
// ---------------------------------------------------------------------------

#[test]
fn test_pruning_through_select_into_join_side() {
    let mut md = Metadata::new();
    let l = md.add_table("l", &["a", "b", "e"]);
    let r = md.add_table("r", &["c", "d"]);
    let (a, b, c, d) = (col(&md, l, "a"), col(&md, l, "b"), col(&md, r, "c"), col(&md, r, "d"));

    let plan = keep(
        &[b],
        PlanNode::new(
            Operator::Select {
                filter: Expr::gt(Expr::col(d), Expr::int(0)),
            },
            vec![PlanNode::new(
                Operator::Join {
                    join_type: JoinType::Inner,
                    on: Expr::equals(Expr::col(a), Expr::col(c)),
                },
                vec![scan(&md, l, &["a", "b", "e"]), scan(&md, r, &["c", "d"])],
            )],
        ),
    );
    let result = normalize(&plan);
    assert_eq!(scan_cols(&result), vec![set(&[a, b]), set(&[c, d])]);
}

#[test]
fn test_limit_ordering_column_survives() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, c) = (col(&md, t, "a"), col(&md, t, "c"));
    let plan = keep(
        &[a],
        PlanNode::new(
            Operator::Limit {
                count: 10,
                ordering: Ordering::asc(&[c]),
            },
            vec![scan(&md, t, &["a", "b", "c"])],
        ),
    );
    let result = normalize(&plan);
    assert_eq!(scan_cols(&result), vec![set(&[a, c])]);
    assert_eq!(
        result.children[0].op,
        Operator::Limit {
            count: 10,
            ordering: Ordering::asc(&[c]),
        }
    );
}

#[test]
fn test_semi_join_right_side_keeps_only_key() {
    let mut md = Metadata::new();
    let l = md.add_table("l", &["a", "b"]);
    let r = md.add_table("r", &["c", "d", "e"]);
    let (a, c) = (col(&md, l, "a"), col(&md, r, "c"));
    let plan = PlanNode::new(
        Operator::Join {
            join_type: JoinType::Semi,
            on: Expr::equals(Expr::col(a), Expr::col(c)),
        },
        vec![scan(&md, l, &["a", "b"]), scan(&md, r, &["c", "d", "e"])],
    );
    let result = normalize(&plan);
    let b = col(&md, l, "b");
    assert_eq!(scan_cols(&result), vec![set(&[a, b]), set(&[c])]);
}

#[test]
fn test_row_number_partition_survives() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, b) = (col(&md, t, "a"), col(&md, t, "b"));
    let rn = md.add_column("rn");
    let plan = keep(
        &[rn],
        PlanNode::new(
            Operator::RowNumber {
                def: RowNumberDef {
                    col: rn,
                    partition_by: set(&[b]),
                    ordering: Ordering::none(),
                },
            },
            vec![scan(&md, t, &["a", "b", "c"])],
        ),
    );
    let result = normalize(&plan);
    assert_eq!(scan_cols(&result), vec![set(&[b])]);
    assert!(!scan_cols(&result)[0].contains(a));
}

#[test]
fn test_explain_prunes_explained_statement() {
    let mut md = Metadata::new();
    let t = md.add_table("t", &["a", "b", "c"]);
    let (a, b) = (col(&md, t, "a"), col(&md, t, "b"));
    let (x, y) = (md.add_column("x"), md.add_column("y"));
    let text = md.add_column("info");

    let plan = PlanNode::new(
        Operator::Explain {
            cols: vec![text],
            props: PhysicalProps::with_presentation(vec![x]),
        },
        vec![PlanNode::new(
            Operator::Project {
                projections: vec![
                    ProjectionItem::new(x, Expr::col(a)),
                    ProjectionItem::new(y, Expr::col(b)),
                ],
                passthrough: ColSet::new(),
            },
            vec![scan(&md, t, &["a", "b", "c"])],
        )],
    );
    let result = normalize(&plan);
    assert_eq!(
        result.children[0].op,
        Operator::Project {
            projections: vec![ProjectionItem::new(x, Expr::col(a))],
            passthrough: ColSet::new(),
        }
    );
    assert_eq!(scan_cols(&result), vec![set(&[a])]);
}

#[test]
fn test_values_columns_are_pruned_and_identity_project_removed() {
    let mut md = Metadata::new();
    let (p, q) = (md.add_column("p"), md.add_column("q"));
    let values = PlanNode::leaf(Operator::Values {
        cols: vec![p, q],
        rows: vec![
            vec![Expr::int(1), Expr::int(2)],
            vec![Expr::int(3), Expr::int(4)],
        ],
    });
    let result = normalize(&keep(&[q], values));
    assert_eq!(
        result,
        PlanNode::leaf(Operator::Values {
            cols: vec![q],
            rows: vec![vec![Expr::int(2)], vec![Expr::int(4)]],
        })
    );
}

#[test]
fn test_normalization_is_idempotent() {
    let mut md = Metadata::new();
    let plan = {
        let t = md.add_table("t", &["a", "b", "c", "d"]);
        let (a, c) = (col(&md, t, "a"), col(&md, t, "c"));
        keep(
            &[a],
            PlanNode::new(
                Operator::Select {
                    filter: Expr::gt(Expr::col(c), Expr::int(0)),
                },
                vec![scan(&md, t, &["a", "b", "c", "d"])],
            ),
        )
    };
    let mut memo = Memo::new();
    let root = memo.insert_plan(&plan).unwrap();
    let mut n = normalizer(memo);
    let first = n.normalize(root).unwrap();
    let applied = n.iterations();
    assert!(applied > 0);
    assert_eq!(n.normalize(first).unwrap(), first);
    assert_eq!(n.iterations(), applied);
}
