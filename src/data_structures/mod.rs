//! Data structures for Mauka Paths.
//!
//! This module contains specialized data structures optimized for
//! concurrent operations:
//! - Concurrent insertion without a global lock
//! - Zero unsafe code

pub mod prefixed_tree;

// Re-export common data structures
pub use prefixed_tree::{CompressedNode, NodeId, PathNode, PrefixedTree};
