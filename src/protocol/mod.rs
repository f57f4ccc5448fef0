//! Protocol module for Mauka Paths.
//!
//! This module implements the persisted form of a prefixed tree: the byte
//! stream primitives and the tree encoder/decoder built on them.

pub mod stream;
pub mod tree;
