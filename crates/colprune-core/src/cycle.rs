//! # Cycle Detection
//!
//! A safety net for the pruning rules. Every application of a `DetectCycle` rule is
//! reported as a `before -> after` pair and checked against the run's history:
//!
//! - **No progress**: the replacement does not have a strictly smaller column weight
//!   than the expression it replaces. The weight of a subtree is the sum of the output
//!   column counts of all its nodes, so a pruning step that removed nothing (or that
//!   rebuilt the same expression) is caught here.
//! - **Oscillation**: following the recorded history from the replacement leads back
//!   to the expression being rewritten.
//!
//! Either outcome means a prune-safety derivation promised a column that pruning could
//! not remove. It is never retried.

use crate::memo::{ExprId, Memo};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Why a rewrite was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleKind {
    NoProgress,
    Oscillation,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleKind::NoProgress => write!(f, "rewrite removed no columns"),
            CycleKind::Oscillation => write!(f, "rewrite reproduces an earlier expression"),
        }
    }
}

/// Per-run rewrite history.
#[derive(Debug, Default)]
pub struct CycleDetector {
    history: HashMap<ExprId, ExprId>,
    weights: HashMap<ExprId, u64>,
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a rewrite and record it if it is accepted.
    pub fn check(&mut self, memo: &Memo, before: ExprId, after: ExprId) -> Result<(), CycleKind> {
        if before == after {
            return Err(CycleKind::NoProgress);
        }

        let mut cursor = after;
        let mut steps = 0;
        while let Some(&next) = self.history.get(&cursor) {
            if next == before {
                return Err(CycleKind::Oscillation);
            }
            cursor = next;
            steps += 1;
            if steps > self.history.len() {
                break;
            }
        }

        if self.weight(memo, after) >= self.weight(memo, before) {
            return Err(CycleKind::NoProgress);
        }

        self.history.insert(before, after);
        Ok(())
    }

    /// Sum of output column counts over every node of the subtree.
    pub fn weight(&mut self, memo: &Memo, id: ExprId) -> u64 {
        if let Some(&w) = self.weights.get(&id) {
            return w;
        }
        let expr = memo.expr(id);
        let mut w = expr.props.output_cols.len() as u64;
        for &child in &expr.children {
            w += self.weight(memo, child);
        }
        self.weights.insert(id, w);
        w
    }

    /// Number of recorded rewrites.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
