//! # Declarative Pattern Matching for Rules
//!
//! Each rule declares a [`Pattern`] describing the shape of expressions it rewrites.
//! The normalizer matches the pattern against an expression before consulting the
//! rule's side-condition, and the match produces [`Bindings`]: the expression ids
//! captured by name (`$input`, `$left`, ...) plus any column sets the side-condition
//! computes and binds (`$needed`).
//!
//! ## Pattern Language
//!
//! - `Pattern::Operator(matcher, children)`: the expression's operator satisfies
//!   `matcher` and each child matches the corresponding child pattern.
//! - `Pattern::Capture(name, inner)`: matches `inner` and binds the expression to `name`.
//! - `Pattern::Any`: matches any expression.
//! - `Pattern::Leaf`: matches only expressions without children.
//!
//! Unlike a memo of equivalence groups, every child here is a single expression, so a
//! child pattern either matches that expression or the whole match fails.

use crate::colset::ColSet;
use crate::expr::{JoinType, OpKind, Operator};
use crate::memo::{ExprId, Memo};
use std::collections::HashMap;

/// Pattern for matching expressions in the memo.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Match an operator with child patterns.
    Operator(OpMatcher, Vec<Pattern>),
    /// Match the inner pattern and bind the expression under a name.
    Capture(&'static str, Box<Pattern>),
    /// Match any expression.
    Any,
    /// Match an expression with no children.
    Leaf,
}

/// Matcher for operator types (without data).
#[derive(Debug, Clone)]
pub enum OpMatcher {
    Kind(OpKind),
    AnyOf(Vec<OpKind>),
    /// A join whose type is one of the listed types.
    Join(Vec<JoinType>),
}

impl OpMatcher {
    pub fn matches(&self, op: &Operator) -> bool {
        match self {
            OpMatcher::Kind(kind) => op.kind() == *kind,
            OpMatcher::AnyOf(kinds) => kinds.contains(&op.kind()),
            OpMatcher::Join(types) => match op {
                Operator::Join { join_type, .. } => types.contains(join_type),
                _ => false,
            },
        }
    }
}

impl Pattern {
    /// `name:inner`
    pub fn capture(name: &'static str, inner: Pattern) -> Self {
        Pattern::Capture(name, Box::new(inner))
    }

    /// `name:*`
    pub fn any(name: &'static str) -> Self {
        Pattern::capture(name, Pattern::Any)
    }

    pub fn op(kind: OpKind, children: Vec<Pattern>) -> Self {
        Pattern::Operator(OpMatcher::Kind(kind), children)
    }

    /// A join of one of `types` with two child patterns.
    pub fn join(types: &[JoinType], left: Pattern, right: Pattern) -> Self {
        Pattern::Operator(OpMatcher::Join(types.to_vec()), vec![left, right])
    }

    /// `(Project input)`, the outer shape shared by most pruning rules.
    pub fn project(input: Pattern) -> Self {
        Pattern::op(OpKind::Project, vec![input])
    }

    /// Every capture name declared in this pattern, in declaration order.
    pub fn captures(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_captures(&mut out);
        out
    }

    fn collect_captures(&self, out: &mut Vec<&'static str>) {
        match self {
            Pattern::Capture(name, inner) => {
                out.push(name);
                inner.collect_captures(out);
            }
            Pattern::Operator(_, children) => {
                for c in children {
                    c.collect_captures(out);
                }
            }
            Pattern::Any | Pattern::Leaf => {}
        }
    }
}

/// Values bound during a match: captured expressions and computed column sets.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    exprs: HashMap<&'static str, ExprId>,
    cols: HashMap<&'static str, ColSet>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expr(&self, name: &str) -> Option<ExprId> {
        self.exprs.get(name).copied()
    }

    pub fn cols(&self, name: &str) -> Option<&ColSet> {
        self.cols.get(name)
    }

    pub fn bind_expr(&mut self, name: &'static str, id: ExprId) {
        self.exprs.insert(name, id);
    }

    pub fn bind_cols(&mut self, name: &'static str, cols: ColSet) {
        self.cols.insert(name, cols);
    }
}

/// Match `pattern` against the expression `expr_id`, returning the bindings on success.
pub fn matches(memo: &Memo, expr_id: ExprId, pattern: &Pattern) -> Option<Bindings> {
    let mut bindings = Bindings::new();
    bind(memo, expr_id, pattern, &mut bindings).then_some(bindings)
}

fn bind(memo: &Memo, expr_id: ExprId, pattern: &Pattern, out: &mut Bindings) -> bool {
    let expr = memo.expr(expr_id);
    match pattern {
        Pattern::Any => true,
        Pattern::Leaf => expr.children.is_empty(),
        Pattern::Capture(name, inner) => {
            if !bind(memo, expr_id, inner, out) {
                return false;
            }
            out.bind_expr(name, expr_id);
            true
        }
        Pattern::Operator(matcher, child_patterns) => {
            if !matcher.matches(&expr.op) {
                return false;
            }
            if expr.children.len() != child_patterns.len() {
                return false;
            }
            expr.children
                .iter()
                .zip(child_patterns)
                .all(|(&child, p)| bind(memo, child, p, out))
        }
    }
}
