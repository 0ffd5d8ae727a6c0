use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    iter::Peekable,
    slice,
};

use log::debug;
#[cfg(feature = "serde")]
use log::error;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    clocks::{counter::Counter, relation::Relation},
    error::ClockError,
};

/// Entries sorted strictly by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Entries<K, C>(Vec<(K, C)>);

impl<K: Ord, C> Entries<K, C> {
    fn search(&self, key: &K) -> Result<usize, usize> {
        self.0.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Position of the first entry breaking the strict key order, if any.
    fn first_unordered(&self) -> Option<usize> {
        self.0
            .windows(2)
            .position(|w| w[0].0 >= w[1].0)
            .map(|i| i + 1)
    }
}

/// Walks two entry lists in key order, pairing up the values of equal keys.
struct Aligned<'a, K, C> {
    lhs: Peekable<slice::Iter<'a, (K, C)>>,
    rhs: Peekable<slice::Iter<'a, (K, C)>>,
}

impl<'a, K, C> Aligned<'a, K, C> {
    fn new(lhs: &'a Entries<K, C>, rhs: &'a Entries<K, C>) -> Self {
        Self {
            lhs: lhs.0.iter().peekable(),
            rhs: rhs.0.iter().peekable(),
        }
    }
}

impl<'a, K: Ord, C> Iterator for Aligned<'a, K, C> {
    type Item = (&'a K, Option<&'a C>, Option<&'a C>);

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.lhs.peek(), self.rhs.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((l, _)), Some((r, _))) => l.cmp(r),
        };
        match order {
            Ordering::Less => {
                let (k, v) = self.lhs.next()?;
                Some((k, Some(v), None))
            }
            Ordering::Greater => {
                let (k, v) = self.rhs.next()?;
                Some((k, None, Some(v)))
            }
            Ordering::Equal => {
                let (k, l) = self.lhs.next()?;
                let (_, r) = self.rhs.next()?;
                Some((k, Some(l), Some(r)))
            }
        }
    }
}

/// An exact vector clock.
///
/// Maps keys to counters. A key without an entry is the bottom element and
/// compares lower than any stored counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorClock<K = usize, C = usize> {
    entries: Entries<K, C>,
}

impl<K, C> Default for VectorClock<K, C> {
    fn default() -> Self {
        Self {
            entries: Entries(Vec::new()),
        }
    }
}

impl<K: Ord, C> VectorClock<K, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(key: K, value: C) -> Self {
        Self {
            entries: Entries(vec![(key, value)]),
        }
    }

    /// Folds [`VectorClock::insert`] over the pairs: the last value given for a
    /// key wins.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, C)>) -> Self {
        let mut clock = Self::new();
        for (key, value) in entries {
            clock.insert(key, value);
        }
        clock
    }

    /// Builds a clock from pairs that must already be sorted by strictly
    /// increasing key.
    pub fn try_from_sorted(entries: Vec<(K, C)>) -> Result<Self, ClockError> {
        let clock = Self {
            entries: Entries(entries),
        };
        clock.check()?;
        Ok(clock)
    }

    pub fn len(&self) -> usize {
        self.entries.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.0.is_empty()
    }

    /// # Complexity
    /// `O(log n)`
    pub fn get(&self, key: &K) -> Option<&C> {
        self.entries.search(key).ok().map(|i| &self.entries.0[i].1)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.search(key).is_ok()
    }

    /// Sets the entry of `key`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: C) -> Option<C> {
        match self.entries.search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries.0[i].1, value)),
            Err(i) => {
                self.entries.0.insert(i, (key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<C> {
        self.entries
            .search(key)
            .ok()
            .map(|i| self.entries.0.remove(i).1)
    }

    /// Entries in increasing key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &C)> + '_ {
        self.entries.0.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.0.iter().map(|(k, _)| k)
    }

    pub fn into_entries(self) -> Vec<(K, C)> {
        self.entries.0
    }

    /// Checks that keys are strictly increasing.
    pub fn check(&self) -> Result<(), ClockError> {
        match self.entries.first_unordered() {
            Some(index) => Err(ClockError::UnorderedEntries { index }),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}

impl<K: Ord, C: Ord> VectorClock<K, C> {
    /// Relation of `a` to `b` under the pointwise order.
    ///
    /// # Complexity
    /// `O(n + m)`, stops early once the clocks are known to be concurrent.
    pub fn relation(a: &Self, b: &Self) -> Relation {
        let mut a_greater = false;
        let mut b_greater = false;
        for (_, l, r) in Aligned::new(&a.entries, &b.entries) {
            match (l, r) {
                (Some(l), Some(r)) => match l.cmp(r) {
                    Ordering::Greater => a_greater = true,
                    Ordering::Less => b_greater = true,
                    Ordering::Equal => {}
                },
                (Some(_), None) => a_greater = true,
                (None, Some(_)) => b_greater = true,
                (None, None) => {}
            }
            if a_greater && b_greater {
                break;
            }
        }
        Relation::from_flags(a_greater, b_greater)
    }

    /// Whether `a` happened strictly before `b`.
    pub fn causes(a: &Self, b: &Self) -> bool {
        Self::relation(a, b) == Relation::Causes
    }
}

impl<K: Ord + Clone, C: Ord + Clone> VectorClock<K, C> {
    /// Pointwise merge. `f` sees every key present on either side and decides
    /// the resulting entry; returning `None` drops the key.
    ///
    /// # Complexity
    /// `O(n + m)` calls to `f`
    pub fn combine<F>(a: &Self, b: &Self, mut f: F) -> Self
    where
        F: FnMut(&K, Option<&C>, Option<&C>) -> Option<C>,
    {
        let entries = Aligned::new(&a.entries, &b.entries)
            .filter_map(|(k, l, r)| f(k, l, r).map(|v| (k.clone(), v)))
            .collect();
        Self {
            entries: Entries(entries),
        }
    }

    /// Least upper bound of the two clocks.
    pub fn max(a: &Self, b: &Self) -> Self {
        Self::combine(a, b, |_, l, r| max_entry(l, r))
    }

    /// In-place [`VectorClock::max`].
    pub fn join(&mut self, other: &Self) {
        // `self` already dominates `other`
        if matches!(
            Self::relation(self, other),
            Relation::CausedBy | Relation::Identical
        ) {
            return;
        }
        *self = Self::max(self, other);
    }

    /// The smallest clock `d` such that `max(d, older) == newer`.
    ///
    /// Returns `None` unless `older` causally precedes or equals `newer`.
    pub fn diff(newer: &Self, older: &Self) -> Option<Self> {
        match Self::relation(older, newer) {
            Relation::Identical => Some(Self::new()),
            Relation::Causes => {
                let entries = Aligned::new(&newer.entries, &older.entries)
                    .filter_map(|(k, n, o)| match (n, o) {
                        (Some(n), Some(o)) if n == o => None,
                        (Some(n), _) => Some((k.clone(), n.clone())),
                        (None, _) => None,
                    })
                    .collect();
                Some(Self {
                    entries: Entries(entries),
                })
            }
            relation => {
                debug!("no diff: older clock is {relation} the newer one");
                None
            }
        }
    }
}

impl<K, C> VectorClock<K, C>
where
    K: Ord,
    C: Counter,
{
    /// Increments an existing entry, returning its new value.
    /// Does nothing and returns `None` if `key` has no entry.
    /// A counter at its maximum stays there.
    pub fn increment(&mut self, key: &K) -> Option<C> {
        let i = self.entries.search(key).ok()?;
        let value = &mut self.entries.0[i].1;
        *value = value.saturating_succ();
        Some(value.clone())
    }

    /// Increments the entry of `key`, treating a missing entry as `default`.
    pub fn increment_or(&mut self, key: K, default: C) -> C {
        match self.entries.search(&key) {
            Ok(i) => {
                let value = &mut self.entries.0[i].1;
                *value = value.saturating_succ();
                value.clone()
            }
            Err(i) => {
                let value = default.saturating_succ();
                self.entries.0.insert(i, (key, value.clone()));
                value
            }
        }
    }
}

pub(crate) fn max_entry<C: Ord + Clone>(l: Option<&C>, r: Option<&C>) -> Option<C> {
    match (l, r) {
        (Some(l), Some(r)) => Some(l.max(r).clone()),
        (Some(v), None) | (None, Some(v)) => Some(v.clone()),
        (None, None) => None,
    }
}

impl<K: Ord, C: Ord> PartialOrd for VectorClock<K, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Self::relation(self, other).into()
    }
}

impl<K: Ord, C> FromIterator<(K, C)> for VectorClock<K, C> {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<K: Ord, C> Extend<(K, C)> for VectorClock<K, C> {
    fn extend<I: IntoIterator<Item = (K, C)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Display, C: Display> Display for VectorClock<K, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // {0: 5, 3: 2}
        write!(
            f,
            "{{{}}}",
            self.entries
                .0
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[cfg(feature = "serde")]
impl<K: Serialize, C: Serialize> Serialize for VectorClock<K, C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.0.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, K, C> Deserialize<'de> for VectorClock<K, C>
where
    K: Ord + Deserialize<'de>,
    C: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(K, C)>::deserialize(deserializer)?;
        VectorClock::try_from_sorted(entries).map_err(|e| {
            error!("Rejected decoded vector clock: {e}");
            <D::Error as serde::de::Error>::custom(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vc(entries: &[(usize, u64)]) -> VectorClock<usize, u64> {
        VectorClock::from_entries(entries.iter().copied())
    }

    #[test_log::test]
    fn insert_keeps_keys_sorted() {
        let clock = vc(&[(3, 1), (0, 4), (7, 2), (1, 9)]);
        assert_eq!(clock.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3, 7]);
        assert!(clock.is_valid());
    }

    #[test_log::test]
    fn insert_overwrites() {
        let mut clock = vc(&[(1, 5)]);
        assert_eq!(clock.insert(1, 2), Some(5));
        assert_eq!(clock.get(&1), Some(&2));
        assert_eq!(clock.len(), 1);
    }

    #[test_log::test]
    fn increment_missing_is_noop() {
        let mut clock = vc(&[(1, 5)]);
        assert_eq!(clock.increment(&2), None);
        assert_eq!(clock, vc(&[(1, 5)]));
        assert_eq!(clock.increment(&1), Some(6));
    }

    #[test_log::test]
    fn increment_or_default() {
        let mut clock = vc(&[(1, 5)]);
        assert_eq!(clock.increment_or(2, 10), 11);
        assert_eq!(clock.increment_or(1, 10), 6);
        assert_eq!(clock, vc(&[(1, 6), (2, 11)]));
    }

    #[test_log::test]
    fn increment_saturates() {
        let mut clock = vc(&[(1, u64::MAX)]);
        assert_eq!(clock.increment(&1), Some(u64::MAX));
        assert_eq!(clock.increment_or(1, 0), u64::MAX);
        assert_eq!(clock.increment_or(2, u64::MAX), u64::MAX);
        assert!(clock.is_valid());
    }

    #[test_log::test]
    fn remove() {
        let mut clock = vc(&[(1, 5), (2, 3)]);
        assert_eq!(clock.remove(&1), Some(5));
        assert_eq!(clock.remove(&1), None);
        assert!(!clock.contains(&1));
        assert_eq!(clock.len(), 1);
    }

    #[test_log::test]
    fn merge() {
        let a = vc(&[(0, 1), (1, 4)]);
        let b = vc(&[(1, 2), (2, 3)]);
        assert_eq!(VectorClock::max(&a, &b), vc(&[(0, 1), (1, 4), (2, 3)]));

        let mut joined = a.clone();
        joined.join(&b);
        assert_eq!(joined, VectorClock::max(&a, &b));
    }

    #[test_log::test]
    fn combine_intersection() {
        let a = vc(&[(0, 1), (1, 4)]);
        let b = vc(&[(1, 2), (2, 3)]);
        let meet = VectorClock::combine(&a, &b, |_, l, r| match (l, r) {
            (Some(l), Some(r)) => Some(*l.min(r)),
            _ => None,
        });
        assert_eq!(meet, vc(&[(1, 2)]));
    }

    #[test_log::test]
    fn relations() {
        let a = vc(&[(0, 1)]);
        let b = vc(&[(0, 1), (1, 1)]);
        let c = vc(&[(0, 2)]);
        assert_eq!(VectorClock::relation(&a, &b), Relation::Causes);
        assert_eq!(VectorClock::relation(&b, &a), Relation::CausedBy);
        assert_eq!(VectorClock::relation(&b, &c), Relation::Concurrent);
        assert_eq!(VectorClock::relation(&a, &a), Relation::Identical);
        assert!(VectorClock::causes(&a, &c));
        assert!(!VectorClock::causes(&a, &a));
        assert!(a < b);
        assert_eq!(b.partial_cmp(&c), None);
    }

    #[test_log::test]
    fn empty_causes_everything() {
        let empty = VectorClock::<usize, u64>::new();
        assert!(VectorClock::causes(&empty, &vc(&[(4, 0)])));
    }

    #[test_log::test]
    fn diff_keeps_advanced_entries() {
        let older = vc(&[(1, 5), (2, 3)]);
        let newer = vc(&[(1, 7), (2, 3), (4, 1)]);
        let d = VectorClock::diff(&newer, &older).unwrap();
        assert_eq!(d, vc(&[(1, 7), (4, 1)]));
        assert_eq!(VectorClock::max(&d, &older), newer);
    }

    #[test_log::test]
    fn diff_requires_causality() {
        let a = vc(&[(1, 5)]);
        let b = vc(&[(2, 5)]);
        assert_eq!(VectorClock::diff(&a, &b), None);
        assert_eq!(VectorClock::diff(&a, &vc(&[(1, 6)])), None);
        assert_eq!(VectorClock::diff(&a, &a), Some(VectorClock::new()));
    }

    #[test_log::test]
    fn try_from_sorted_rejects_disorder() {
        assert_eq!(
            VectorClock::try_from_sorted(vec![(1, 1u64), (1, 2)]),
            Err(ClockError::UnorderedEntries { index: 1 })
        );
        assert_eq!(
            VectorClock::try_from_sorted(vec![(0, 1u64), (3, 1), (2, 2)]),
            Err(ClockError::UnorderedEntries { index: 2 })
        );
        assert!(VectorClock::try_from_sorted(vec![(0, 1u64), (3, 1)]).is_ok());
    }

    #[test_log::test]
    fn display() {
        assert_eq!(vc(&[(3, 2), (0, 5)]).to_string(), "{0: 5, 3: 2}");
        assert_eq!(VectorClock::<usize, u64>::new().to_string(), "{}");
    }
}
