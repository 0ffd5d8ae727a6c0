/// Parameters of a fuzzing run, only built through [`RunConfig::new`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Probability that an operation joins a peer's clock instead of ticking
    pub(super) join_rate: f64,
    /// Number of replicas in the system
    pub(super) num_replicas: u8,
    /// Total number of operations to be issued
    pub(super) num_operations: usize,
    /// Buckets of every replica's clock
    pub(super) capacity: usize,
    /// Whether every replica joins every other one at the end
    pub(super) final_merge: bool,
    /// Seed for the random number generator
    pub(super) seed: Option<u64>,
}

impl RunConfig {
    pub fn new(
        join_rate: f64,
        num_replicas: u8,
        num_operations: usize,
        capacity: usize,
        final_merge: bool,
        seed: Option<u64>,
    ) -> Self {
        assert!(
            (0.0..=1.0).contains(&join_rate),
            "Join rate must be between 0 and 1"
        );
        assert!(num_replicas > 1, "Number of replicas must be greater than 1");
        assert!(
            num_operations > 0,
            "Number of operations must be greater than 0"
        );
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            join_rate,
            num_replicas,
            num_operations,
            capacity,
            final_merge,
            seed,
        }
    }
}
