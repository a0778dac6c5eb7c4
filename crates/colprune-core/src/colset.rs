//! # Column Identifiers and Column Sets
//!
//! Every column that flows through a plan is identified by a [`ColumnId`]: an opaque
//! handle assigned when the column is introduced (by a scan, a projection, or a
//! synthesized computation such as an aggregation or a row number). Identifiers are
//! stable for the lifetime of a query and are never renumbered by normalization.
//!
//! [`ColSet`] is the set type used by every part of the pruning pass: the analyzer
//! returns needed-column sets, the prune-safety property is a set, and rule
//! side-conditions compare sets by value. It is backed by a `BTreeSet`, so iteration
//! order is deterministic and sets can be hashed (memo interning keys contain them).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque, globally-unique column handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// An unordered set of columns with value semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColSet(BTreeSet<ColumnId>);

impl ColSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, col: ColumnId) -> bool {
        self.0.insert(col)
    }

    pub fn remove(&mut self, col: ColumnId) -> bool {
        self.0.remove(&col)
    }

    pub fn contains(&self, col: ColumnId) -> bool {
        self.0.contains(&col)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The smallest column in the set.
    pub fn first(&self) -> Option<ColumnId> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &ColSet) -> ColSet {
        // Clone the larger side and insert the smaller one.
        let (big, small) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut out = big.clone();
        out.0.extend(small.iter());
        out
    }

    pub fn union_with(&mut self, other: &ColSet) {
        self.0.extend(other.iter());
    }

    pub fn difference(&self, other: &ColSet) -> ColSet {
        ColSet(self.0.difference(&other.0).copied().collect())
    }

    pub fn intersection(&self, other: &ColSet) -> ColSet {
        ColSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn intersects(&self, other: &ColSet) -> bool {
        let (small, big) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|c| big.contains(c))
    }

    pub fn is_subset_of(&self, other: &ColSet) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<ColumnId> for ColSet {
    fn from_iter<I: IntoIterator<Item = ColumnId>>(iter: I) -> Self {
        ColSet(iter.into_iter().collect())
    }
}

impl Extend<ColumnId> for ColSet {
    fn extend<I: IntoIterator<Item = ColumnId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ColSet {
    type Item = ColumnId;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, ColumnId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl fmt::Display for ColSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c.0)?;
        }
        write!(f, ")")
    }
}

/// Build a set from raw column numbers. Mostly useful in tests.
pub fn cols(ids: &[u32]) -> ColSet {
    ids.iter().map(|&i| ColumnId(i)).collect()
}
