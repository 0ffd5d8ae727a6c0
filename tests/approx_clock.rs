use std::hash::{BuildHasher, Hasher};

use approx_vclock::{ApproxClock, ClockError, IdentityState, Relation, VectorClock};

/// Every actor hashes to the same value.
#[derive(Debug, Clone, Copy, Default)]
struct CollidingState;

struct CollidingHasher;

impl Hasher for CollidingHasher {
    fn finish(&self) -> u64 {
        7
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for CollidingState {
    type Hasher = CollidingHasher;

    fn build_hasher(&self) -> Self::Hasher {
        CollidingHasher
    }
}

#[test_log::test]
fn diff_recovers_the_advanced_bucket() {
    let older = ApproxClock::<u64, u64>::from_entries(4, [(1, 5), (2, 3)]);
    let newer = ApproxClock::max(&older, &ApproxClock::from_entries(4, [(1, 7)]));

    let d = ApproxClock::diff(&newer, &older).unwrap();
    assert_eq!(d, ApproxClock::from_entries(4, [(1, 7)]));
    assert_eq!(ApproxClock::max(&d, &older), newer);
}

#[test_log::test]
fn collisions_found_under_the_default_hasher() {
    let capacity = 4;
    let clock = ApproxClock::<u64, u64>::new(capacity);
    // pigeonhole: among capacity + 1 actors two share a bucket
    let actors: Vec<u64> = (0..=capacity as u64).collect();
    let (a, b) = actors
        .iter()
        .flat_map(|a| actors.iter().map(move |b| (*a, *b)))
        .find(|(a, b)| a != b && clock.bucket_of(a) == clock.bucket_of(b))
        .unwrap();

    let mut clock = clock;
    clock.insert(&a, 1);
    clock.insert(&b, 2);
    assert_eq!(clock.get(&a), Some(&2));
    assert_eq!(clock.get(&b), Some(&2));
}

#[test_log::test]
fn adversarial_hasher_collapses_to_one_entry() {
    let mut alice = ApproxClock::<&str, u64, CollidingState>::new(16);
    let mut bob = ApproxClock::<&str, u64, CollidingState>::new(16);
    for actor in ["alice", "bob", "carol", "dave"] {
        alice.increment_or(&actor, 0);
    }
    assert_eq!(alice.len(), 1);
    assert_eq!(alice.get(&"zed"), Some(&4));

    // bob never saw alice's events, yet looks causally before her
    bob.increment_or(&"bob", 0);
    assert!(ApproxClock::causes(&bob, &alice));
    assert!(alice.is_valid());
}

#[test_log::test]
fn exact_clocks_tell_concurrency_apart() {
    let a = ApproxClock::<u64, u64, IdentityState>::from_entries(8, [(1, 1)]);
    let b = ApproxClock::<u64, u64, IdentityState>::from_entries(8, [(2, 1)]);
    assert_eq!(ApproxClock::relation(&a, &b), Relation::Concurrent);
    assert_eq!(ApproxClock::diff(&a, &b), None);

    // same actors with a single bucket
    let a = ApproxClock::<u64, u64, IdentityState>::from_entries(1, [(1, 1)]);
    let b = ApproxClock::<u64, u64, IdentityState>::from_entries(1, [(2, 1)]);
    assert_eq!(ApproxClock::relation(&a, &b), Relation::Identical);
}

#[test_log::test]
fn relation_follows_events() {
    let mut a = ApproxClock::<u64, u64, IdentityState>::new(8);
    a.increment_or(&1, 0);
    let mut b = a.clone();
    b.increment_or(&2, 0);
    assert!(ApproxClock::causes(&a, &b));
    assert!(a < b);

    a.increment_or(&1, 0);
    assert_eq!(ApproxClock::relation(&a, &b), Relation::Concurrent);
    assert_eq!(a.partial_cmp(&b), None);

    a.join(&b);
    assert_eq!(ApproxClock::relation(&b, &a), Relation::Causes);
    assert_eq!(
        a.iter().map(|(bucket, v)| (bucket, *v)).collect::<Vec<_>>(),
        vec![(1, 2), (2, 1)]
    );
}

#[test_log::test]
fn different_capacities_do_not_compare() {
    let a = ApproxClock::<u64, u64, IdentityState>::new(2);
    let b = ApproxClock::<u64, u64, IdentityState>::new(3);
    assert_ne!(a, b);
    assert_eq!(a.partial_cmp(&b), None);
    assert_eq!(ApproxClock::relation(&a, &b), Relation::Identical);
}

#[test_log::test]
fn construction_errors() {
    assert_eq!(
        ApproxClock::<u64, u64>::try_new(0).unwrap_err(),
        ClockError::ZeroCapacity
    );
    assert_eq!(
        ApproxClock::<u64, u64, _>::try_with_hasher(0, IdentityState).unwrap_err(),
        ClockError::ZeroCapacity
    );
}

#[test_log::test]
fn exposes_the_underlying_engine() {
    let clock = ApproxClock::<u64, u64, IdentityState>::from_entries(4, [(5, 2), (2, 9)]);
    let expected: VectorClock<usize, u64> = [(1, 2), (2, 9)].into_iter().collect();
    assert_eq!(clock.as_vector_clock(), &expected);
    assert_eq!(clock.into_vector_clock(), expected);
}
