use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{BuildHasher, Hash},
    marker::PhantomData,
};

use rustc_hash::FxBuildHasher;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace};

use crate::{
    clocks::{
        bucket::bucket_of,
        counter::Counter,
        relation::Relation,
        vector_clock::{max_entry, VectorClock},
    },
    error::ClockError,
};

/// A vector clock over at most `capacity` buckets.
///
/// Actors of type `A` are hashed with `S` into a bucket in `[0, capacity)`,
/// and every operation acts on that bucket. Actors are never stored: colliding
/// actors share (and overwrite) a single counter, so a `Causes` relation may
/// be a false positive, while the number of entries never exceeds the capacity.
///
/// Lookups accept any borrowed form `Q` of the actor type, like
/// [`std::collections::HashMap`], so `Hash` must agree between `A` and `Q`.
pub struct ApproxClock<A, C = u64, S = FxBuildHasher> {
    entries: VectorClock<usize, C>,
    capacity: usize,
    hasher: S,
    _actor: PhantomData<fn(A)>,
}

impl<A, C, S> ApproxClock<A, C, S>
where
    A: Hash,
    S: BuildHasher + Default,
{
    /// An empty clock.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, S::default())
    }

    pub fn try_new(capacity: usize) -> Result<Self, ClockError> {
        Self::try_with_hasher(capacity, S::default())
    }

    /// Inserts the pairs in order onto an empty clock. Later pairs overwrite
    /// earlier ones falling into the same bucket.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn from_entries(capacity: usize, entries: impl IntoIterator<Item = (A, C)>) -> Self {
        let mut clock = Self::new(capacity);
        clock.extend(entries);
        clock
    }

    pub fn singleton(capacity: usize, actor: A, value: C) -> Self {
        Self::from_entries(capacity, [(actor, value)])
    }
}

impl<A, C, S> ApproxClock<A, C, S>
where
    A: Hash,
    S: BuildHasher,
{
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        assert!(capacity > 0, "{}", ClockError::ZeroCapacity);
        Self {
            entries: VectorClock::new(),
            capacity,
            hasher,
            _actor: PhantomData,
        }
    }

    pub fn try_with_hasher(capacity: usize, hasher: S) -> Result<Self, ClockError> {
        if capacity == 0 {
            return Err(ClockError::ZeroCapacity);
        }
        Ok(Self::with_hasher(capacity, hasher))
    }

    /// The bucket `actor` maps to in this clock.
    pub fn bucket_of<Q>(&self, actor: &Q) -> usize
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        bucket_of(&self.hasher, actor, self.capacity)
    }

    pub fn contains<Q>(&self, actor: &Q) -> bool
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        self.entries.contains(&self.bucket_of(actor))
    }

    /// The counter of the bucket `actor` maps to, whichever actor wrote it.
    pub fn get<Q>(&self, actor: &Q) -> Option<&C>
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        self.entries.get(&self.bucket_of(actor))
    }

    /// Sets the counter of the bucket `actor` maps to, returning the value it
    /// replaced, possibly written by a colliding actor.
    pub fn insert<Q>(&mut self, actor: &Q, value: C) -> Option<C>
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        let bucket = self.bucket_of(actor);
        let previous = self.entries.insert(bucket, value);
        if previous.is_some() {
            trace!(bucket, "bucket entry overwritten");
        }
        previous
    }

    /// Removes the bucket `actor` maps to, for every actor sharing it.
    pub fn remove<Q>(&mut self, actor: &Q) -> Option<C>
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        let bucket = self.bucket_of(actor);
        let removed = self.entries.remove(&bucket);
        if removed.is_some() {
            trace!(bucket, "bucket entry removed");
        }
        removed
    }
}

impl<A, C, S> ApproxClock<A, C, S>
where
    A: Hash,
    C: Counter,
    S: BuildHasher,
{
    /// Increments the bucket of `actor`. Returns `None` and leaves the clock
    /// untouched if the bucket has no entry yet.
    pub fn increment<Q>(&mut self, actor: &Q) -> Option<C>
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        let bucket = self.bucket_of(actor);
        self.entries.increment(&bucket)
    }

    /// Increments the bucket of `actor`, a missing entry counting as `default`.
    pub fn increment_or<Q>(&mut self, actor: &Q, default: C) -> C
    where
        A: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        let bucket = self.bucket_of(actor);
        self.entries.increment_or(bucket, default)
    }
}

impl<A, C, S> ApproxClock<A, C, S> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied buckets, not the number of actors seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Occupied buckets and their counters, by increasing bucket.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &C)> + '_ {
        self.entries.iter().map(|(bucket, value)| (*bucket, value))
    }

    pub fn as_vector_clock(&self) -> &VectorClock<usize, C> {
        &self.entries
    }

    pub fn into_vector_clock(self) -> VectorClock<usize, C> {
        self.entries
    }

    /// Checks that the clock fits its capacity and that the underlying
    /// engine is well formed.
    pub fn check(&self) -> Result<(), ClockError> {
        if self.len() > self.capacity {
            return Err(ClockError::CapacityExceeded {
                len: self.len(),
                capacity: self.capacity,
            });
        }
        self.entries.check()?;
        // keys are sorted, the last one is the largest
        match self.entries.keys().last() {
            Some(&bucket) if bucket >= self.capacity => Err(ClockError::BucketOutOfRange {
                bucket,
                capacity: self.capacity,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}

impl<A, C: Ord, S> ApproxClock<A, C, S> {
    /// Relation of `lhs` to `rhs`, compared bucket by bucket.
    ///
    /// # Complexity
    /// `O(n + m)` in the number of occupied buckets
    pub fn relation(lhs: &Self, rhs: &Self) -> Relation {
        VectorClock::relation(&lhs.entries, &rhs.entries)
    }

    /// Whether `lhs` happened before `rhs`. May be a false positive when
    /// actors collided.
    pub fn causes(lhs: &Self, rhs: &Self) -> bool {
        Self::relation(lhs, rhs) == Relation::Causes
    }
}

impl<A, C, S> ApproxClock<A, C, S>
where
    C: Ord + Clone,
    S: Clone,
{
    /// Pointwise merge over buckets. `f` is called with each bucket occupied on
    /// either side and decides its resulting entry. The result has the larger
    /// of the two capacities and the hasher of `lhs`.
    pub fn combine<F>(lhs: &Self, rhs: &Self, mut f: F) -> Self
    where
        F: FnMut(usize, Option<&C>, Option<&C>) -> Option<C>,
    {
        Self {
            entries: VectorClock::combine(&lhs.entries, &rhs.entries, |bucket, l, r| {
                f(*bucket, l, r)
            }),
            capacity: lhs.capacity.max(rhs.capacity),
            hasher: lhs.hasher.clone(),
            _actor: PhantomData,
        }
    }

    /// Least upper bound of the two clocks.
    pub fn max(lhs: &Self, rhs: &Self) -> Self {
        Self::combine(lhs, rhs, |_, l, r| max_entry(l, r))
    }

    /// In-place [`ApproxClock::max`].
    pub fn join(&mut self, other: &Self) {
        if self.capacity != other.capacity {
            debug!(
                lhs = self.capacity,
                rhs = other.capacity,
                "joining clocks of different capacities"
            );
            self.capacity = self.capacity.max(other.capacity);
        }
        self.entries.join(&other.entries);
    }

    /// The smallest clock `d` such that `max(d, older) == newer`, with the
    /// capacity of `newer`.
    ///
    /// Returns `None` unless `older` causally precedes or equals `newer`.
    pub fn diff(newer: &Self, older: &Self) -> Option<Self> {
        VectorClock::diff(&newer.entries, &older.entries).map(|entries| Self {
            entries,
            capacity: newer.capacity,
            hasher: newer.hasher.clone(),
            _actor: PhantomData,
        })
    }
}

impl<A, C, S> Extend<(A, C)> for ApproxClock<A, C, S>
where
    A: Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (A, C)>>(&mut self, iter: I) {
        for (actor, value) in iter {
            self.insert(&actor, value);
        }
    }
}

impl<A, C: Clone, S: Clone> Clone for ApproxClock<A, C, S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            capacity: self.capacity,
            hasher: self.hasher.clone(),
            _actor: PhantomData,
        }
    }
}

impl<A, C: Debug, S> Debug for ApproxClock<A, C, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApproxClock")
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<A, C: Display, S> Display for ApproxClock<A, C, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // {0: 5, 3: 2}/4
        write!(f, "{}/{}", self.entries, self.capacity)
    }
}

/// The hasher is not part of the value.
impl<A, C: PartialEq, S> PartialEq for ApproxClock<A, C, S> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.entries == other.entries
    }
}

impl<A, C: Eq, S> Eq for ApproxClock<A, C, S> {}

/// Clocks of different capacities are incomparable.
impl<A, C: Ord, S> PartialOrd for ApproxClock<A, C, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.capacity != other.capacity {
            return None;
        }
        Self::relation(self, other).into()
    }
}

#[cfg(feature = "serde")]
impl<A, C: Serialize, S> Serialize for ApproxClock<A, C, S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        (&self.entries, self.capacity).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, A, C, S> Deserialize<'de> for ApproxClock<A, C, S>
where
    C: Deserialize<'de>,
    S: Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (entries, capacity) = <(VectorClock<usize, C>, usize)>::deserialize(deserializer)?;
        if capacity == 0 {
            return Err(<D::Error as serde::de::Error>::custom(
                ClockError::ZeroCapacity,
            ));
        }
        let clock = Self {
            entries,
            capacity,
            hasher: S::default(),
            _actor: PhantomData,
        };
        clock
            .check()
            .map_err(<D::Error as serde::de::Error>::custom)?;
        Ok(clock)
    }
}
