use std::hash::BuildHasher;

use rand::{Rng, RngCore};

use crate::clocks::approx_clock::ApproxClock;

pub trait ValueGenerator {
    type Config: Default;

    fn generate(rng: &mut impl RngCore, config: &Self::Config) -> Self;
}

/// Inclusive range of generated numbers.
#[derive(Debug, Clone, Copy)]
pub struct NumberConfig {
    min: u64,
    max: u64,
}

impl NumberConfig {
    pub fn new(min: u64, max: u64) -> Result<Self, &'static str> {
        if min > max {
            return Err("min must be <= max");
        }
        Ok(Self { min, max })
    }
}

impl Default for NumberConfig {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl ValueGenerator for u64 {
    type Config = NumberConfig;

    fn generate(rng: &mut impl RngCore, config: &Self::Config) -> Self {
        rng.random_range(config.min..=config.max)
    }
}

impl ValueGenerator for usize {
    type Config = NumberConfig;

    fn generate(rng: &mut impl RngCore, config: &Self::Config) -> Self {
        u64::generate(rng, config) as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClockConfig {
    /// Buckets of the generated clocks
    pub capacity: usize,
    /// Upper bound on the number of inserted pairs, not on the resulting entries
    pub max_inserts: usize,
    /// Actors are drawn from `0..=max_actor`
    pub actors: NumberConfig,
    pub counters: NumberConfig,
}

impl ClockConfig {
    pub fn new(capacity: usize, max_inserts: usize, max_actor: u64, max_counter: u64) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            capacity,
            max_inserts,
            actors: NumberConfig {
                min: 0,
                max: max_actor,
            },
            counters: NumberConfig {
                min: 0,
                max: max_counter,
            },
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::new(8, 16, 64, 20)
    }
}

/// Random insertions of random actors onto an empty clock.
impl<S> ValueGenerator for ApproxClock<u64, u64, S>
where
    S: BuildHasher + Default,
{
    type Config = ClockConfig;

    fn generate(rng: &mut impl RngCore, config: &Self::Config) -> Self {
        let inserts = rng.random_range(0..=config.max_inserts);
        let pairs: Vec<(u64, u64)> = (0..inserts)
            .map(|_| {
                (
                    u64::generate(rng, &config.actors),
                    u64::generate(rng, &config.counters),
                )
            })
            .collect();
        ApproxClock::from_entries(config.capacity, pairs)
    }
}
