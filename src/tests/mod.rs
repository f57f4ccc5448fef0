//! Test modules for Mauka Paths.
//!
//! This module contains the crate-level test infrastructure:
//! - Configuration loading and validation tests
//! - Error handling and reporting tests
//! - Property-based tests for the prefixed tree and its codec
//! - Test fixtures and path strategies

pub mod prefixed_tree_tests;

// Re-export commonly used testing tools to simplify imports in test modules
pub use test_utils::{path_set_strategy, path_strategy, TestFixture};
