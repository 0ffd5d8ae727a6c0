use thiserror::Error;

/// Structural violations of a clock.
///
/// Absence (missing actor, inapplicable diff, ...) is never an error and is
/// reported through `Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("an approximate clock needs at least one bucket")]
    ZeroCapacity,
    #[error("clock entries are not strictly ordered by key at position {index}")]
    UnorderedEntries { index: usize },
    #[error("clock holds {len} entries but its capacity is {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },
    #[error("bucket {bucket} lies outside of capacity {capacity}")]
    BucketOutOfRange { bucket: usize, capacity: usize },
}
