pub mod aggregate;
pub mod runner;
pub mod sampler;
pub mod schedule;
