//! Initialization of logging shared by every binary and test that uses the
//! trading crates.
pub mod config;
pub mod tracing;

pub use config::Config;
