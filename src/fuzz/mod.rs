//! Randomised replicas exchanging approximate clocks.

use std::fmt::{Display, Formatter};

use log::{error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    clocks::{approx_clock::ApproxClock, relation::Relation},
    fuzz::config::RunConfig,
    HashMap,
};

pub mod config;
pub mod value_generator;

type ReplicaClock = ApproxClock<u64, u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A replica's clock broke a structural invariant
    InvalidClock { replica: usize, step: usize },
    /// A join did not dominate one of its inputs
    JoinNotUpperBound { replica: usize, step: usize },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::InvalidClock { replica, step } => {
                write!(f, "replica {replica} holds an invalid clock at step {step}")
            }
            Violation::JoinNotUpperBound { replica, step } => {
                write!(f, "join at replica {replica} lost information at step {step}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub increments: usize,
    pub joins: usize,
    /// Local ticks issued by each replica
    pub ticks_per_replica: HashMap<usize, usize>,
    pub violations: Vec<Violation>,
    /// Whether all replicas ended with identical clocks
    pub converged: bool,
    pub final_clock: ReplicaClock,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.converged && self.violations.is_empty()
    }
}

pub fn fuzzer(runs: &[RunConfig]) -> Vec<RunReport> {
    runs.iter().map(runner).collect()
}

/// Replica `i` ticks actor `i` or joins a random peer, `config.num_operations`
/// times. Every step is checked against the clock laws.
pub fn runner(config: &RunConfig) -> RunReport {
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };
    let num_replicas = config.num_replicas as usize;
    let mut replicas: Vec<ReplicaClock> = (0..num_replicas)
        .map(|_| ApproxClock::new(config.capacity))
        .collect();

    let mut increments = 0;
    let mut joins = 0;
    let mut ticks_per_replica: HashMap<usize, usize> = HashMap::default();
    let mut violations = Vec::new();

    for step in 0..config.num_operations {
        let idx = rng.random_range(0..num_replicas);
        if rng.random_bool(config.join_rate) {
            let mut peer = rng.random_range(0..num_replicas - 1);
            if peer >= idx {
                peer += 1;
            }
            let before = replicas[idx].clone();
            let other = replicas[peer].clone();
            replicas[idx].join(&other);
            joins += 1;

            let joined = &replicas[idx];
            let dominates = |input: &ReplicaClock| {
                matches!(
                    ApproxClock::relation(input, joined),
                    Relation::Causes | Relation::Identical
                )
            };
            if !dominates(&before) || !dominates(&other) {
                error!("Join at replica {idx} does not dominate its inputs: {joined}");
                violations.push(Violation::JoinNotUpperBound { replica: idx, step });
            }
        } else {
            replicas[idx].increment_or(&(idx as u64), 0);
            increments += 1;
            *ticks_per_replica.entry(idx).or_insert(0) += 1;
        }

        if !replicas[idx].is_valid() {
            error!("Replica {idx} holds an invalid clock: {}", replicas[idx]);
            violations.push(Violation::InvalidClock { replica: idx, step });
        }
    }

    if config.final_merge {
        // replica 0 gathers every entry before the others pull from it
        for i in 0..num_replicas {
            for j in 0..num_replicas {
                if i != j {
                    let other = replicas[j].clone();
                    replicas[i].join(&other);
                }
            }
        }
    }

    let converged = replicas.iter().all(|r| *r == replicas[0]);
    if config.final_merge && !converged {
        error!("Replicas diverged after the final merge");
    }
    info!(
        "Run finished: {increments} ticks, {joins} joins, {} violations, final clock {}",
        violations.len(),
        replicas[0]
    );

    RunReport {
        increments,
        joins,
        ticks_per_replica,
        violations,
        converged,
        final_clock: replicas.swap_remove(0),
    }
}
