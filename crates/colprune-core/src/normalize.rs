//! # Fixpoint Normalizer
//!
//! This module drives the rule catalog over an expression DAG until no `Normalize` rule
//! applies anywhere.
//!
//! ## How It Works
//!
//! Normalization is bottom-up and memoized per [`ExprId`] within a run:
//!
//! 1. Normalize every child of the expression.
//! 2. If any child changed, rebuild the expression over the new children (hash-consing
//!    may hand back an expression that already exists).
//! 3. Try the `Normalize` rules in registry order. The first rule whose pattern matches
//!    and whose condition holds produces a replacement.
//! 4. On success, restart at step 1 with the replacement, whose new children have not
//!    been normalized yet. Otherwise the expression is final.
//!
//! Because rules only inspect an expression, its children and properties of their
//! (already final) subtrees, a final root means no rule applies anywhere below it.
//!
//! ## Termination
//!
//! Every application of a `DetectCycle` rule goes through the [`CycleDetector`]. A rule
//! without that tag that hands back the expression it was given is treated as not
//! matching. The iteration budget (`max_iterations`) is the last safety valve: when it
//! runs out the normalizer stops rewriting and returns the current tree, which is
//! valid but may not be fully pruned.

use crate::cycle::CycleDetector;
use crate::error::NormalizeError;
use crate::memo::{ExprId, Memo};
use crate::pattern::matches;
use crate::prune_safety::{DefaultPruneSafety, PruneSafety, SafetyCache};
use crate::rule::{OptContext, RuleRegistry, RuleTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Configuration knobs for the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Upper bound on the number of rule applications per run.
    pub max_iterations: usize,
    /// Check `DetectCycle` rule applications for progress.
    pub detect_cycles: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            detect_cycles: true,
        }
    }
}

/// State scoped to a single `normalize` call.
struct Run {
    safety: SafetyCache,
    detector: CycleDetector,
    normalized: HashMap<ExprId, ExprId>,
    /// Rule applications in this run, checked against `max_iterations`.
    applied: usize,
    budget_exhausted: bool,
}

/// The normalization engine.
///
/// Owns the memo. Several normalizers can run on different threads as long as each
/// has its own memo; the rule registry and prune-safety derivation are shared.
pub struct Normalizer {
    pub memo: Memo,
    pub rule_registry: Arc<RuleRegistry>,
    pub prune_safety: Arc<dyn PruneSafety>,
    pub config: NormalizeConfig,
    /// Rule applications across all runs of this normalizer.
    iterations: usize,
}

impl Normalizer {
    /// Create a normalizer, rejecting an invalid rule catalog up front.
    pub fn new(
        memo: Memo,
        rule_registry: Arc<RuleRegistry>,
        config: NormalizeConfig,
    ) -> Result<Self, NormalizeError> {
        rule_registry.validate()?;
        Ok(Self {
            memo,
            rule_registry,
            prune_safety: Arc::new(DefaultPruneSafety),
            config,
            iterations: 0,
        })
    }

    /// Replace the prune-safety derivation.
    pub fn with_prune_safety(mut self, prune_safety: Arc<dyn PruneSafety>) -> Self {
        self.prune_safety = prune_safety;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Normalize the tree rooted at `root` to fixpoint.
    pub fn normalize(&mut self, root: ExprId) -> Result<ExprId, NormalizeError> {
        debug!(
            "Starting normalization: root={}, exprs={}",
            root,
            self.memo.num_exprs()
        );
        let mut run = Run {
            safety: SafetyCache::new(Arc::clone(&self.prune_safety)),
            detector: CycleDetector::new(),
            normalized: HashMap::new(),
            applied: 0,
            budget_exhausted: false,
        };
        let result = self.normalize_expr(root, &mut run)?;
        debug!(
            "Normalization complete: root={}, applications={}, exprs={}",
            result,
            run.applied,
            self.memo.num_exprs()
        );
        Ok(result)
    }

    fn normalize_expr(&mut self, id: ExprId, run: &mut Run) -> Result<ExprId, NormalizeError> {
        if let Some(&done) = run.normalized.get(&id) {
            return Ok(done);
        }

        let mut current = id;
        loop {
            let children = self.memo.expr(current).children.clone();
            let mut new_children = Vec::with_capacity(children.len());
            for child in children {
                new_children.push(self.normalize_expr(child, run)?);
            }
            current = self.memo.rebuild(current, new_children);

            match self.apply_first_rule(current, run)? {
                Some(next) => current = next,
                None => break,
            }
        }

        run.normalized.insert(id, current);
        run.normalized.insert(current, current);
        Ok(current)
    }

    /// Apply the highest-priority rule that fires on `id`, returning the replacement.
    fn apply_first_rule(
        &mut self,
        id: ExprId,
        run: &mut Run,
    ) -> Result<Option<ExprId>, NormalizeError> {
        if run.applied >= self.config.max_iterations {
            if !run.budget_exhausted {
                debug!("Hit iteration limit: max_iterations={}", self.config.max_iterations);
                run.budget_exhausted = true;
            }
            return Ok(None);
        }

        let registry = Arc::clone(&self.rule_registry);
        for rule in registry.normalize_rules() {
            let Some(mut bindings) = matches(&self.memo, id, &rule.pattern()) else {
                continue;
            };
            let mut ctx = OptContext::new(&mut self.memo, &mut run.safety);
            if !rule.condition(id, &mut bindings, &mut ctx) {
                continue;
            }
            let Some(replacement) = rule.replace(id, &bindings, &mut ctx) else {
                continue;
            };

            let detect = rule.has_tag(RuleTag::DetectCycle);
            if detect && self.config.detect_cycles {
                if let Err(kind) = run.detector.check(&self.memo, id, replacement) {
                    warn!(
                        "Cycle detected: rule={}, expr={}, kind={:?}",
                        rule.name(),
                        id,
                        kind
                    );
                    return Err(NormalizeError::CycleDetected {
                        rule: rule.name().to_string(),
                        expr: id,
                        kind,
                    });
                }
            } else if !detect && replacement == id {
                continue;
            }

            run.applied += 1;
            self.iterations += 1;
            trace!(
                "Applied rule '{}': {} -> {}",
                rule.name(),
                id,
                replacement
            );
            return Ok(Some(replacement));
        }
        Ok(None)
    }
}
