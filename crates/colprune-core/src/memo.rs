//! # Memo: Interned Expression Arena
//!
//! The memo stores every expression the pass has ever seen or built. Expressions are
//! immutable and addressed by [`ExprId`]. Insertion is hash-consed: adding an
//! `(operator, children)` pair that already exists returns the existing id, so
//! structurally identical subtrees always share one identity.
//!
//! That identity is what the rest of the pass keys on:
//!
//! - the prune-safety property is memoized per `ExprId`;
//! - the cycle detector records `before -> after` pairs of `ExprId`s;
//! - the normalizer memoizes the normalized form of each `ExprId` within a run.
//!
//! Rewriting never mutates an entry. A rule builds a replacement by interning new
//! expressions and the caller relinks parents to the new id.
//!
//! ## Plan Trees
//!
//! [`PlanNode`] is the owned tree form used at the edges of the pass: drivers build
//! one (or deserialize it), [`Memo::insert_plan`] validates and interns it, and
//! [`Memo::extract_plan`] turns a normalized root back into a tree.

use crate::colset::{ColSet, ColumnId};
use crate::expr::{OpKind, Operator};
use crate::properties::LogicalProps;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Identifier of an interned expression.
pub type ExprId = u32;

/// An operator plus the ids of its children and its derived logical properties.
#[derive(Debug, Clone)]
pub struct MemoExpr {
    pub op: Operator,
    pub children: Vec<ExprId>,
    pub props: LogicalProps,
}

/// Append-only, hash-consed expression arena.
#[derive(Debug, Default)]
pub struct Memo {
    exprs: Vec<MemoExpr>,
    index: HashMap<(Operator, Vec<ExprId>), ExprId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an expression, returning the id of the existing copy if there is one.
    ///
    /// # Panics
    ///
    /// Panics if the number of children does not match the operator's arity or a child
    /// id is not in the memo. Untrusted plans go through [`Memo::insert_plan`], which
    /// reports these as errors instead.
    pub fn add_expr(&mut self, op: Operator, children: Vec<ExprId>) -> ExprId {
        assert_eq!(
            op.arity(),
            children.len(),
            "{:?} takes {} children",
            op.kind(),
            op.arity()
        );
        let key = (op, children);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let (op, children) = key;
        let child_props: Vec<&LogicalProps> =
            children.iter().map(|&c| &self.exprs[c as usize].props).collect();
        let props = LogicalProps::derive(&op, &child_props);

        let id = self.exprs.len() as ExprId;
        self.index.insert((op.clone(), children.clone()), id);
        self.exprs.push(MemoExpr {
            op,
            children,
            props,
        });
        id
    }

    pub fn expr(&self, id: ExprId) -> &MemoExpr {
        &self.exprs[id as usize]
    }

    pub fn output_cols(&self, id: ExprId) -> &ColSet {
        &self.exprs[id as usize].props.output_cols
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    /// Construct the same operator over new children.
    ///
    /// This is how rules rebuild "whatever kind of join (or grouping) this was" after
    /// replacing one input.
    pub fn rebuild(&mut self, id: ExprId, children: Vec<ExprId>) -> ExprId {
        if self.expr(id).children == children {
            return id;
        }
        let op = self.expr(id).op.clone();
        self.add_expr(op, children)
    }

    /// Validate and intern an owned plan tree, bottom-up.
    pub fn insert_plan(&mut self, plan: &PlanNode) -> Result<ExprId, MemoError> {
        if plan.op.arity() != plan.children.len() {
            return Err(MemoError::ArityMismatch {
                op: plan.op.kind(),
                expected: plan.op.arity(),
                found: plan.children.len(),
            });
        }
        if let Operator::Values { cols, rows } = &plan.op {
            if let Some(row) = rows.iter().find(|r| r.len() != cols.len()) {
                return Err(MemoError::ValuesRowWidth {
                    expected: cols.len(),
                    found: row.len(),
                });
            }
        }

        let mut children = Vec::with_capacity(plan.children.len());
        for child in &plan.children {
            children.push(self.insert_plan(child)?);
        }

        let mut available = ColSet::new();
        for &c in &children {
            available.union_with(self.output_cols(c));
        }
        let missing = plan.op.referenced_cols().difference(&available);
        if !missing.is_empty() {
            return Err(MemoError::MissingInputColumns {
                op: plan.op.kind(),
                missing,
            });
        }

        // Column ids are unique within a plan: an operator may not define a column its
        // inputs already produce, and join sides may not share one.
        let mut seen = available;
        if let [left, right] = children.as_slice() {
            let shared = self.output_cols(*left).intersection(self.output_cols(*right));
            if let Some(col) = shared.first() {
                return Err(MemoError::DuplicateColumn {
                    op: plan.op.kind(),
                    col,
                });
            }
        }
        for col in plan.op.defined_cols() {
            if !seen.insert(col) {
                return Err(MemoError::DuplicateColumn {
                    op: plan.op.kind(),
                    col,
                });
            }
        }

        Ok(self.add_expr(plan.op.clone(), children))
    }

    /// Materialize the tree rooted at `id`.
    pub fn extract_plan(&self, id: ExprId) -> PlanNode {
        let expr = self.expr(id);
        PlanNode {
            op: expr.op.clone(),
            children: expr.children.iter().map(|&c| self.extract_plan(c)).collect(),
        }
    }

    /// Indented rendering of the tree rooted at `id`.
    pub fn display(&self, id: ExprId) -> String {
        self.extract_plan(id).display(0)
    }
}

/// Owned plan tree, the interchange form at the edges of the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanNode {
    pub op: Operator,
    #[serde(default)]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(op: Operator, children: Vec<PlanNode>) -> Self {
        Self { op, children }
    }

    pub fn leaf(op: Operator) -> Self {
        Self {
            op,
            children: vec![],
        }
    }

    pub fn display(&self, indent: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}{}", "  ".repeat(indent), self.op);
        for child in &self.children {
            out.push_str(&child.display(indent + 1));
        }
        out
    }
}

/// Errors raised while interning an untrusted plan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MemoError {
    #[error("{op:?} expects {expected} children, found {found}")]
    ArityMismatch {
        op: OpKind,
        expected: usize,
        found: usize,
    },
    #[error("Values row has {found} expressions for {expected} columns")]
    ValuesRowWidth { expected: usize, found: usize },
    #[error("{op:?} references columns {missing} that its inputs do not produce")]
    MissingInputColumns { op: OpKind, missing: ColSet },
    #[error("{op:?} defines column {col}, which is already in scope")]
    DuplicateColumn { op: OpKind, col: ColumnId },
}
