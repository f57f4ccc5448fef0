//! Decoded tree node payloads.

use crate::data_structures::prefixed_tree::NodeId;

/// The decoded payload of one persisted tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Whether an inserted path ends at this node
    pub is_final: bool,

    /// Segment text, possibly several components joined by `/`
    pub segment: String,

    /// Id of the parent node, absent for the tree root
    pub parent: Option<NodeId>,
}
