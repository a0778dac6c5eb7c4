//! # Rule System
//!
//! This module defines the rule trait and the ordered rule registry that drive the
//! normalizer.
//!
//! ## Anatomy of a Rule
//!
//! A rule is the already-resolved form of a declarative catalog entry:
//!
//! - a **pattern** over operator shape with named captures (`$input`, `$left`, ...);
//! - an optional **condition** that inspects the captures, may compute and bind column
//!   sets (`$needed`), and decides whether the rule fires;
//! - a **replacement** that builds the new expression from the bindings;
//! - a set of **tags**. Only `Normalize` rules are run by the normalizer, and
//!   `DetectCycle` rules have every application checked by the cycle detector.
//!
//! Each rule also declares which names its condition binds and which names its
//! condition and replacement read. The registry validates those declarations against
//! the pattern before first use, so a rule that reads a capture the pattern never
//! declares is rejected up front instead of silently never firing.
//!
//! ## Priority
//!
//! The registry is an ordered list. When several rules match the same expression the
//! first one registered wins, which keeps rewriting reproducible.

use crate::colset::ColSet;
use crate::memo::{ExprId, Memo};
use crate::pattern::{Bindings, Pattern};
use crate::prune;
use crate::prune_safety::SafetyCache;
use serde::Serialize;
use std::collections::HashSet;

/// Classification tags carried by catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleTag {
    /// Run by the normalizer until fixpoint.
    Normalize,
    /// Applications are checked by the cycle detector.
    DetectCycle,
}

/// Context passed to rules during matching and application.
///
/// Gives rules write access to the memo (replacements intern new expressions) and to
/// the per-run prune-safety cache.
pub struct OptContext<'a> {
    pub memo: &'a mut Memo,
    pub safety: &'a mut SafetyCache,
}

impl<'a> OptContext<'a> {
    pub fn new(memo: &'a mut Memo, safety: &'a mut SafetyCache) -> Self {
        Self { memo, safety }
    }

    pub fn output_cols(&self, id: ExprId) -> ColSet {
        self.memo.output_cols(id).clone()
    }

    /// Whether pruning `id` down to `needed` is both possible and productive.
    pub fn can_prune_cols(&mut self, id: ExprId, needed: &ColSet) -> bool {
        self.safety.can_prune_cols(self.memo, id, needed)
    }

    /// Narrow `id` so that it produces only the columns in `keep` that it can shed.
    pub fn prune_cols(&mut self, id: ExprId, keep: &ColSet) -> ExprId {
        prune::prune_cols(self, id, keep)
    }
}

/// A rewrite rule.
pub trait Rule: Send + Sync {
    /// Unique name of this rule.
    fn name(&self) -> &str;

    fn tags(&self) -> &'static [RuleTag] {
        &[RuleTag::Normalize]
    }

    /// Pattern that this rule matches against.
    fn pattern(&self) -> Pattern;

    /// Names the condition binds into the bindings (e.g. `$needed`).
    fn binds(&self) -> &'static [&'static str] {
        &[]
    }

    /// Names the condition and replacement read.
    fn reads(&self) -> &'static [&'static str] {
        &[]
    }

    /// Side-condition evaluated after the pattern matched.
    fn condition(&self, _expr: ExprId, _bindings: &mut Bindings, _ctx: &mut OptContext) -> bool {
        true
    }

    /// Build the replacement for `expr`. `None` means the rule does not apply after all.
    fn replace(&self, expr: ExprId, bindings: &Bindings, ctx: &mut OptContext) -> Option<ExprId>;

    fn has_tag(&self, tag: RuleTag) -> bool {
        self.tags().contains(&tag)
    }
}

/// Errors found while validating a rule catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule {0} is registered more than once")]
    DuplicateRule(String),
    #[error("rule {rule} reads {capture}, which its pattern does not declare")]
    UndeclaredCapture { rule: String, capture: String },
    #[error("rule {rule} declares {capture} more than once")]
    DuplicateCapture { rule: String, capture: String },
}

/// Ordered registry of rewrite rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Later rules have lower priority.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rules tagged `Normalize`, in priority order.
    pub fn normalize_rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules().filter(|r| r.has_tag(RuleTag::Normalize))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.rules().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check every rule's declarations against its pattern.
    pub fn validate(&self) -> Result<(), RuleError> {
        let mut names = HashSet::new();
        for rule in self.rules() {
            if !names.insert(rule.name()) {
                return Err(RuleError::DuplicateRule(rule.name().to_string()));
            }

            let mut declared = HashSet::new();
            let captures = rule.pattern().captures();
            for name in captures.iter().chain(rule.binds()) {
                if !declared.insert(*name) {
                    return Err(RuleError::DuplicateCapture {
                        rule: rule.name().to_string(),
                        capture: name.to_string(),
                    });
                }
            }
            if let Some(missing) = rule.reads().iter().find(|n| !declared.contains(*n)) {
                return Err(RuleError::UndeclaredCapture {
                    rule: rule.name().to_string(),
                    capture: missing.to_string(),
                });
            }
        }
        Ok(())
    }
}
