//! Mapping of actors to buckets.
//!
//! This is the only place where precision is lost: two actors whose hashes
//! agree modulo the capacity are indistinguishable afterwards.

use std::hash::{BuildHasher, Hash, Hasher};

/// Bucket of `actor` in a clock of `capacity` buckets.
///
/// Pure as long as `hasher` is deterministic for the actor type.
/// `capacity` must be non-zero.
pub fn bucket_of<A, S>(hasher: &S, actor: &A, capacity: usize) -> usize
where
    A: Hash + ?Sized,
    S: BuildHasher,
{
    debug_assert!(capacity > 0, "bucket mapping needs a non-zero capacity");
    (hasher.hash_one(actor) % capacity as u64) as usize
}

/// Hashes integer actors to their own value, so that actor `n` lands in
/// bucket `n % capacity`.
///
/// Only an actor hashed as a single integer keeps its value. Everything else
/// (strings, tuples, ...) is folded with FNV-1a, integer writes included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher::default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityHasher {
    hash: u64,
    writes: u32,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Default for IdentityHasher {
    fn default() -> Self {
        Self {
            hash: FNV_OFFSET,
            writes: 0,
        }
    }
}

impl IdentityHasher {
    fn fold(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash ^= u64::from(*byte);
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_integer(&mut self, i: u64) {
        if self.writes == 0 {
            self.hash = i;
        } else {
            self.fold(&i.to_le_bytes());
        }
        self.writes += 1;
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        self.fold(bytes);
        self.writes += 1;
    }

    fn write_u8(&mut self, i: u8) {
        self.write_integer(u64::from(i));
    }

    fn write_u16(&mut self, i: u16) {
        self.write_integer(u64::from(i));
    }

    fn write_u32(&mut self, i: u32) {
        self.write_integer(u64::from(i));
    }

    fn write_u64(&mut self, i: u64) {
        self.write_integer(i);
    }

    fn write_usize(&mut self, i: usize) {
        self.write_integer(i as u64);
    }
}
