//! Errors surfaced by the normalization pass.

use crate::cycle::CycleKind;
use crate::memo::ExprId;
use crate::rule::RuleError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// The rule catalog failed validation before the first run.
    #[error("invalid rule catalog: {0}")]
    InvalidCatalog(#[from] RuleError),
    /// A `DetectCycle` rule made no progress or revisited an earlier expression.
    ///
    /// This points at a defect in a prune-safety derivation, not at the input plan.
    #[error("cycle detected applying {rule} to expr {expr}: {kind}")]
    CycleDetected {
        rule: String,
        expr: ExprId,
        kind: CycleKind,
    },
}
