// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Prefixed tree encoder.
//!
//! References are recorded as node ids into arbitrary caller streams while
//! the tree grows; the tree itself is written once, compressed, to the
//! encoder's own stream by [`TreeEncoder::finish`].

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use super::END_OF_TREE;
use crate::data_structures::prefixed_tree::{CompressedNode, NodeId, PrefixedTree};
use crate::error::{report_error, CodecError, CodecResult, ErrorContext};
use crate::protocol::stream::{CloseableWriteContext, WriteContext};

/// Records path references and persists the tree they index.
///
/// `record_reference` may be called concurrently from any number of
/// threads; `finish` must be called exactly once, after the last reference
/// has been recorded.
#[derive(Debug)]
pub struct TreeEncoder<C: CloseableWriteContext> {
    /// The tree block destination, taken by `finish`
    sink: Mutex<Option<C>>,

    /// Paths recorded so far
    tree: PrefixedTree,

    /// Set once `finish` has started
    finished: AtomicBool,
}

impl<C: CloseableWriteContext> TreeEncoder<C> {
    /// Creates an encoder writing its tree block to `sink`.
    pub fn new(sink: C) -> Self {
        Self::with_tree(sink, PrefixedTree::new())
    }

    /// Creates an encoder over an existing tree.
    pub fn with_tree(sink: C, tree: PrefixedTree) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
            tree,
            finished: AtomicBool::new(false),
        }
    }

    /// Returns the tree being recorded into.
    pub fn tree(&self) -> &PrefixedTree {
        &self.tree
    }

    /// Inserts `path` into the tree and writes its id to `context`.
    ///
    /// # Errors
    ///
    /// * `CodecError::ReferenceAfterFinish` - if the tree was already written
    /// * any error from writing to `context`
    pub fn record_reference<W, P>(&self, context: &mut W, path: P) -> CodecResult<NodeId>
    where
        W: WriteContext + ?Sized,
        P: AsRef<str>,
    {
        let path = path.as_ref();
        if self.finished.load(Ordering::Acquire) {
            return Err(CodecError::ReferenceAfterFinish {
                path: path.to_string(),
            });
        }

        let id = self.tree.insert(path);
        context.write_small_int(wire_id(id)?)?;
        Ok(id)
    }

    /// Compresses the tree, writes it followed by the end-of-tree sentinel,
    /// and closes the sink.
    ///
    /// The sink is closed exactly once, whether or not writing succeeded.
    /// Returns the number of nodes written.
    pub fn finish(&self) -> CodecResult<usize> {
        let mut sink = self.sink.lock().take().ok_or(CodecError::AlreadyFinished)?;
        self.finished.store(true, Ordering::Release);

        let written = write_tree(&mut sink, &self.tree.compress());
        let closed = sink.close();

        match (written, closed) {
            (Ok(nodes), Ok(())) => {
                debug!(nodes, inserted = self.tree.node_count(), "prefixed tree written");
                Ok(nodes)
            }
            (Err(err), _) | (Ok(_), Err(err)) => {
                error!(error = %err, "failed to write prefixed tree");
                Err(err)
            }
        }
    }
}

impl<C: CloseableWriteContext> Drop for TreeEncoder<C> {
    fn drop(&mut self) {
        if self.sink.get_mut().is_some() {
            error!(
                nodes = self.tree.node_count(),
                "tree encoder dropped before finish"
            );
            report_error(
                ErrorContext::new(
                    CodecError::Unfinished {
                        nodes: self.tree.node_count(),
                    },
                    "tree_encoder",
                )
                .with_details("the persisted cache has no tree data and must not be reused"),
            );
        }
    }
}

/// Writes `root` parent-first, then the end-of-tree sentinel.
///
/// Each node is written as `id, is_final, segment, parent` with children in
/// segment order. Returns the number of nodes written.
pub fn write_tree<W>(context: &mut W, root: &CompressedNode) -> CodecResult<usize>
where
    W: WriteContext + ?Sized,
{
    let mut nodes = 0;
    root.walk_preorder(&mut |node, parent| -> CodecResult<()> {
        context.write_small_int(wire_id(node.id)?)?;
        context.write_boolean(node.is_final)?;
        context.write_string(&node.segment)?;
        context.write_nullable_small_int(parent.map(wire_id).transpose()?)?;
        nodes += 1;
        Ok(())
    })?;
    context.write_small_int(END_OF_TREE)?;
    Ok(nodes)
}

fn wire_id(id: NodeId) -> CodecResult<i32> {
    i32::try_from(id).map_err(|_| CodecError::ValueOutOfRange {
        value: i64::from(id),
        context: "node id",
    })
}
