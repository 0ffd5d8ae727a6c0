pub mod approx_clock;
pub mod bucket;
pub mod counter;
pub mod relation;
pub mod vector_clock;
