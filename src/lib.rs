//! Approximate vector clocks.
//!
//! An [`ApproxClock`] tracks causality like an ordinary vector clock, but
//! actors are hashed into a fixed number of buckets chosen by the caller.
//! All actors sharing a bucket share one counter, which bounds the memory
//! footprint at the cost of false-positive `Causes` relations.
//!
//! The exact engine underneath, [`VectorClock`], is usable on its own.

pub mod clocks;
pub mod error;
#[cfg(feature = "fuzz")]
pub mod fuzz;

pub use clocks::{
    approx_clock::ApproxClock,
    bucket::{bucket_of, IdentityState},
    counter::Counter,
    relation::Relation,
    vector_clock::VectorClock,
};
pub use error::ClockError;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
