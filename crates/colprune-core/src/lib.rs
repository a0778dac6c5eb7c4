//! # colprune-core: Column-Pruning Normalization Core
//!
//! This crate implements the data structures and algorithms of the column-pruning
//! normalization pass: a rule-driven rewriter that removes columns no ancestor
//! operator consumes by pushing narrower column lists down the plan until they merge
//! into an operator that filters its own columns.
//!
//! ## Module Overview
//!
//! - **`colset`**: Column identifiers and value-semantics column sets.
//! - **`expr`**: Scalar expressions and the closed set of relational operators.
//! - **`metadata`**: Table and column registry allocating column ids.
//! - **`properties`**: Output columns (logical) and explained-statement requirements (physical).
//! - **`memo`**: Hash-consed expression arena; `ExprId` is the identity everything keys on.
//! - **`pattern`**: Declarative operator-shape patterns with named captures.
//! - **`rule`**: The Rule trait, rule tags and the ordered RuleRegistry.
//! - **`needed`**: Needed-columns analysis, one function per consumer context.
//! - **`prune_safety`**: The memoized prune-safety property.
//! - **`prune`**: `prune_cols` and ordering re-projection.
//! - **`cycle`**: Cycle detection for `DetectCycle` rules.
//! - **`normalize`**: The fixpoint normalizer.
//! - **`error`**: Errors surfaced to the driver.

pub mod colset;
pub mod cycle;
pub mod error;
pub mod expr;
pub mod memo;
pub mod metadata;
pub mod needed;
pub mod normalize;
pub mod pattern;
pub mod properties;
pub mod prune;
pub mod prune_safety;
pub mod rule;

pub use error::NormalizeError;
pub use normalize::{NormalizeConfig, Normalizer};
