use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Causal relation of a clock `a` to a clock `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Relation {
    /// `a` happened before `b`.
    Causes,
    /// `b` happened before `a`.
    CausedBy,
    Concurrent,
    Identical,
}

impl Relation {
    /// The relation of `b` to `a`.
    pub fn reverse(self) -> Self {
        match self {
            Relation::Causes => Relation::CausedBy,
            Relation::CausedBy => Relation::Causes,
            other => other,
        }
    }

    /// Folds the per-entry observations of a pointwise comparison.
    pub(crate) fn from_flags(a_greater: bool, b_greater: bool) -> Self {
        match (a_greater, b_greater) {
            (false, false) => Relation::Identical,
            (false, true) => Relation::Causes,
            (true, false) => Relation::CausedBy,
            (true, true) => Relation::Concurrent,
        }
    }
}

impl From<Relation> for Option<Ordering> {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Causes => Some(Ordering::Less),
            Relation::CausedBy => Some(Ordering::Greater),
            Relation::Identical => Some(Ordering::Equal),
            Relation::Concurrent => None,
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relation::Causes => "causes",
            Relation::CausedBy => "caused by",
            Relation::Concurrent => "concurrent",
            Relation::Identical => "identical",
        };
        f.write_str(s)
    }
}
