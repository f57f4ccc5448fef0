//! Node implementation for the prefixed tree.
//!
//! Nodes are shared between concurrent inserters. A node's id and segment are
//! fixed at creation; only its finality flag and its children change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::NodeId;

/// A mutable node of the prefixed tree.
#[derive(Debug)]
pub struct TreeNode {
    /// Id assigned when the node was created
    id: NodeId,

    /// Path segment this node represents (empty for the root)
    segment: Box<str>,

    /// Whether an inserted path ends at this node
    is_final: AtomicBool,

    /// Children keyed by their segment text
    children: DashMap<Box<str>, Arc<TreeNode>>,
}

impl TreeNode {
    /// Creates a new non-final node without children.
    pub fn new(id: NodeId, segment: &str) -> Self {
        Self {
            id,
            segment: segment.into(),
            is_final: AtomicBool::new(false),
            children: DashMap::new(),
        }
    }

    /// Returns the node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the segment text.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Returns whether an inserted path ends at this node.
    pub fn is_final(&self) -> bool {
        self.is_final.load(Ordering::Acquire)
    }

    pub(crate) fn mark_final(&self) {
        self.is_final.store(true, Ordering::Release);
    }

    /// Returns the child for `segment`, creating it with an id drawn from
    /// `next_id` if absent.
    ///
    /// The id is allocated while the child's shard is write-locked, so racing
    /// callers observe a single node and a single id.
    pub(crate) fn child_or_insert_with<F>(&self, segment: &str, next_id: F) -> Arc<TreeNode>
    where
        F: FnOnce() -> NodeId,
    {
        if let Some(child) = self.children.get(segment) {
            return Arc::clone(child.value());
        }

        self.children
            .entry(segment.into())
            .or_insert_with(|| Arc::new(TreeNode::new(next_id(), segment)))
            .value()
            .clone()
    }

    /// Returns a point-in-time copy of the children.
    pub(crate) fn children(&self) -> Vec<Arc<TreeNode>> {
        self.children
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
