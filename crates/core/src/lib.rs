pub mod common;
pub mod config;
pub mod market;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testing;
