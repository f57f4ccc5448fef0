// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Prefixed Path Tree Implementation
//!
//! A space-optimized prefix tree for filesystem paths. Every path inserted
//! into the tree is identified by a small integer id that can be stored in
//! place of the path and later resolved back into it.
//!
//! # Key Features
//!
//! * Concurrent insertion from any number of threads
//! * Node ids fused with node creation: racing inserters of the same unseen
//!   path observe one node and one id
//! * Radix compression of intermediate runs before persisting
//!
//! Lookups are only efficient through an index table built with
//! [`PrefixedTree::build_indexes`] or [`build_index_map`].
//!
//! # Example
//!
//! ```
//! use mauka_paths_lib::data_structures::prefixed_tree::PrefixedTree;
//!
//! let tree = PrefixedTree::new();
//! let foo = tree.insert("org/example/foo/Foo");
//! let bar = tree.insert("org/example/bar/Bar");
//!
//! let indexes = tree.build_indexes();
//! assert_eq!(indexes[&foo].to_str(), Some("/org/example/foo/Foo"));
//! assert_eq!(indexes[&bar].to_str(), Some("/org/example/bar/Bar"));
//! ```

mod compressed;
mod node;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub use compressed::{build_index_map, compress, CompressedNode, PathNode};
pub use node::TreeNode;

/// Identifier assigned to every tree node.
pub type NodeId = u32;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Id of the root node.
pub const ROOT_ID: NodeId = 0;

/// A concurrent prefix tree of filesystem paths.
///
/// `insert` may be called from any number of threads. `snapshot` and
/// `compress` must only run once all insertions have completed; the tree does
/// not guard against inserts racing with them.
#[derive(Debug)]
pub struct PrefixedTree {
    /// Next id to hand out
    next_id: AtomicU32,

    /// The root node, always id 0
    root: Arc<TreeNode>,
}

impl PrefixedTree {
    /// Creates a tree holding only the root node.
    pub fn new() -> Self {
        let next_id = AtomicU32::new(ROOT_ID);
        let root = Arc::new(TreeNode::new(next_id.fetch_add(1, Ordering::Relaxed), ""));
        Self { next_id, root }
    }

    /// Inserts a path and returns the id of the node that ends it.
    ///
    /// Empty segments are skipped, so `"a//b/"`, `"/a/b"` and `"a/b"` denote
    /// the same path; an empty path denotes the root. Inserting a path again
    /// returns the same id and allocates nothing.
    pub fn insert<P: AsRef<str>>(&self, path: P) -> NodeId {
        let mut current = Arc::clone(&self.root);
        for segment in path.as_ref().split(SEPARATOR).filter(|s| !s.is_empty()) {
            current = current.child_or_insert_with(segment, || {
                self.next_id.fetch_add(1, Ordering::Relaxed)
            });
        }
        current.mark_final();
        current.id()
    }

    /// Returns the number of nodes created so far, the root included.
    pub fn node_count(&self) -> usize {
        self.next_id.load(Ordering::Acquire) as usize
    }

    /// Returns the root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Takes an immutable deep copy of the tree.
    pub fn snapshot(&self) -> PathNode {
        snapshot_from(&self.root)
    }

    /// Compresses the tree following the radix tree idea: runs of non-final
    /// nodes with a single child collapse into one node.
    ///
    /// Ids and finality are preserved. Call only after all insertions are
    /// complete.
    pub fn compress(&self) -> CompressedNode {
        compress(&self.snapshot())
    }

    /// Builds a table from every node id to its absolute path.
    pub fn build_indexes(&self) -> HashMap<NodeId, PathBuf> {
        build_index_map(&self.snapshot())
    }
}

impl Default for PrefixedTree {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_from(node: &TreeNode) -> PathNode {
    let children: BTreeMap<String, PathNode> = node
        .children()
        .iter()
        .map(|child| (child.segment().to_string(), snapshot_from(child)))
        .collect();

    PathNode {
        id: node.id(),
        segment: node.segment().to_string(),
        is_final: node.is_final(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_prefixed_tree_humble_beginning() {
        let tree = PrefixedTree::new();
        let foo = tree.insert("org/example/foo/Foo");
        let bar = tree.insert("org/example/bar/Bar");

        let indexes = tree.build_indexes();

        assert_eq!(indexes[&foo], PathBuf::from("/org/example/foo/Foo"));
        assert_eq!(indexes[&bar], PathBuf::from("/org/example/bar/Bar"));
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let tree = PrefixedTree::new();
        assert_eq!(tree.insert("org/example/foo/Foo"), 4);
        assert_eq!(tree.insert("org/example/bar"), 5);
        assert_eq!(tree.insert("org/example/bar/Bar"), 6);
        assert_eq!(tree.insert("org/example/bar/Bar1"), 7);

        let expected = PathNode::leaf(0, "", false).with_child(
            PathNode::leaf(1, "org", false).with_child(
                PathNode::leaf(2, "example", false)
                    .with_child(
                        PathNode::leaf(3, "foo", false).with_child(PathNode::leaf(4, "Foo", true)),
                    )
                    .with_child(
                        PathNode::leaf(5, "bar", true)
                            .with_child(PathNode::leaf(6, "Bar", true))
                            .with_child(PathNode::leaf(7, "Bar1", true)),
                    ),
            ),
        );

        assert_eq!(tree.snapshot(), expected);
    }

    #[test]
    fn test_compress_merges_intermediate_runs() {
        let tree = PrefixedTree::new();
        tree.insert("org/example/foo/Foo");
        tree.insert("org/example/bar");
        tree.insert("org/example/bar/Bar");
        tree.insert("org/example/bar/Bar1");

        let expected = PathNode::leaf(2, "org/example", false)
            .with_child(PathNode::leaf(4, "foo/Foo", true))
            .with_child(
                PathNode::leaf(5, "bar", true)
                    .with_child(PathNode::leaf(6, "Bar", true))
                    .with_child(PathNode::leaf(7, "Bar1", true)),
            );

        assert_eq!(tree.compress(), expected);
    }

    #[test]
    fn test_tree_is_compressable() {
        let tree = PrefixedTree::new();
        tree.insert("org/example/company/foo/Foo");
        tree.insert("org/example/company/bar/Bar");

        let expected = PathNode::leaf(3, "org/example/company", false)
            .with_child(PathNode::leaf(5, "foo/Foo", true))
            .with_child(PathNode::leaf(7, "bar/Bar", true));

        assert_eq!(tree.compress(), expected);
    }

    #[test]
    fn test_inserted_dirs_are_not_compressable() {
        let tree = PrefixedTree::new();
        tree.insert("org/example/company/foo");
        tree.insert("org/example/company/foo/bar/zum/Zum");

        let expected = PathNode::leaf(3, "org/example/company", false).with_child(
            PathNode::leaf(4, "foo", true).with_child(PathNode::leaf(7, "bar/zum/Zum", true)),
        );

        assert_eq!(tree.compress(), expected);
    }

    #[test]
    fn test_indexes_are_valid_after_compression() {
        let tree = PrefixedTree::new();
        let foo = tree.insert("org/example/foo/Foo");
        let bar = tree.insert("org/example/bar/Bar");

        let indexes = build_index_map(&tree.compress());

        assert_eq!(indexes[&foo], PathBuf::from("/org/example/foo/Foo"));
        assert_eq!(indexes[&bar], PathBuf::from("/org/example/bar/Bar"));
    }

    #[test]
    fn test_returns_the_same_index_for_the_same_file() {
        let tree = PrefixedTree::new();
        let first = tree.insert("org/example/foo/Foo");
        let nodes = tree.node_count();
        let second = tree.insert("/org//example/foo/Foo/");

        assert_eq!(first, second);
        assert_eq!(tree.node_count(), nodes);
    }

    #[test]
    fn test_empty_path_is_root() {
        let tree = PrefixedTree::new();
        assert_eq!(tree.insert(""), ROOT_ID);
        assert_eq!(tree.insert("/"), ROOT_ID);
        assert!(tree.root().is_final());
        assert_eq!(tree.build_indexes()[&ROOT_ID], PathBuf::from("/"));
    }

    #[test]
    fn test_concurrent_inserts_agree_on_ids() {
        const THREAD_COUNT: usize = 8;
        const PATHS: usize = 200;

        let tree = Arc::new(PrefixedTree::new());
        let barrier = Arc::new(Barrier::new(THREAD_COUNT));

        let handles: Vec<_> = (0..THREAD_COUNT)
            .map(|_| {
                let tree = Arc::clone(&tree);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..PATHS)
                        .map(|i| tree.insert(format!("shared/dir{}/file{}", i % 10, i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<NodeId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }

        let distinct: HashSet<_> = results[0].iter().copied().collect();
        assert_eq!(distinct.len(), PATHS);

        // root + "shared" + 10 dirs + one node per file
        assert_eq!(tree.node_count(), 1 + 1 + 10 + PATHS);

        let indexes = tree.build_indexes();
        for (i, id) in results[0].iter().enumerate() {
            assert_eq!(
                indexes[id],
                PathBuf::from(format!("/shared/dir{}/file{}", i % 10, i))
            );
        }
    }
}
