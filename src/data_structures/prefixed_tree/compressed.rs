// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Immutable tree snapshots and radix compression.
//!
//! A [`PathNode`] is a detached, single-threaded copy of the live tree. The
//! same type represents both a plain snapshot and its compressed form, where
//! a node's segment may span several path components.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::{NodeId, SEPARATOR};

/// Compressed tree produced by [`PrefixedTree::compress`].
///
/// [`PrefixedTree::compress`]: super::PrefixedTree::compress
pub type CompressedNode = PathNode;

/// An immutable tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    /// Node id
    pub id: NodeId,

    /// Segment text, possibly several components joined by `/`
    pub segment: String,

    /// Whether an inserted path ends at this node
    pub is_final: bool,

    /// Children keyed by segment text, in sorted order
    pub children: BTreeMap<String, PathNode>,
}

impl PathNode {
    /// Creates a childless node.
    pub fn leaf(id: NodeId, segment: impl Into<String>, is_final: bool) -> Self {
        Self {
            id,
            segment: segment.into(),
            is_final,
            children: BTreeMap::new(),
        }
    }

    /// Adds a child, keyed by its segment.
    pub fn with_child(mut self, child: PathNode) -> Self {
        self.children.insert(child.segment.clone(), child);
        self
    }

    /// Returns the only child, if there is exactly one.
    fn single_child(&self) -> Option<&PathNode> {
        match self.children.len() {
            1 => self.children.values().next(),
            _ => None,
        }
    }

    /// Counts this node and all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(PathNode::node_count).sum::<usize>()
    }

    /// Visits this node and its descendants parent-first, passing each
    /// node together with its parent's id.
    pub fn walk_preorder<E, F>(&self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&PathNode, Option<NodeId>) -> Result<(), E>,
    {
        self.walk_from(None, visit)
    }

    fn walk_from<E, F>(&self, parent: Option<NodeId>, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&PathNode, Option<NodeId>) -> Result<(), E>,
    {
        visit(self, parent)?;
        for child in self.children.values() {
            child.walk_from(Some(self.id), visit)?;
        }
        Ok(())
    }
}

/// Compresses a snapshot by merging runs of single-child intermediate nodes.
pub fn compress(node: &PathNode) -> CompressedNode {
    if node.is_final {
        return PathNode {
            id: node.id,
            segment: node.segment.clone(),
            is_final: true,
            children: compress_children(node),
        };
    }

    let mut segments = Vec::new();
    let mut current = node;
    while let Some(child) = current.single_child().filter(|child| !child.is_final) {
        segments.push(current.segment.as_str());
        current = child;
    }
    segments.push(current.segment.as_str());

    match current.single_child() {
        // A final leaf ends the chain and is absorbed into it.
        Some(child) if child.children.is_empty() => {
            segments.push(child.segment.as_str());
            PathNode::leaf(child.id, join_segments(&segments), true)
        }
        _ => PathNode {
            id: current.id,
            segment: join_segments(&segments),
            is_final: false,
            children: compress_children(current),
        },
    }
}

fn compress_children(node: &PathNode) -> BTreeMap<String, PathNode> {
    node.children
        .values()
        .map(compress)
        .map(|child| (child.segment.clone(), child))
        .collect()
}

fn join_segments(segments: &[&str]) -> String {
    let mut joined = String::new();
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        if !joined.is_empty() {
            joined.push(SEPARATOR);
        }
        joined.push_str(segment);
    }
    joined
}

/// Builds a table from every node id to the absolute path it denotes.
///
/// Works on both plain snapshots and compressed trees; ids present in both
/// map to the same path.
pub fn build_index_map(root: &PathNode) -> HashMap<NodeId, PathBuf> {
    let mut indexes = HashMap::new();
    let mut stack = Vec::new();
    index_from(root, &mut stack, &mut indexes);
    indexes
}

fn index_from<'a>(
    node: &'a PathNode,
    stack: &mut Vec<&'a str>,
    indexes: &mut HashMap<NodeId, PathBuf>,
) {
    stack.push(&node.segment);
    let mut path = String::from(SEPARATOR);
    path.push_str(&join_segments(stack.as_slice()));
    indexes.insert(node.id, PathBuf::from(path));
    for child in node.children.values() {
        index_from(child, stack, indexes);
    }
    stack.pop();
}
