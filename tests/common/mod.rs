//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{example_rules, list_output_dir, TestEnvironment, SCENARIO_URL};
