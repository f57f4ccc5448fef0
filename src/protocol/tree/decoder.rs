// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Prefixed tree decoder.
//!
//! A single background worker owns the tree stream and publishes each node
//! into a table of one-shot slots as it is read. Any number of threads
//! resolve ids concurrently by walking parent chains through that table,
//! waiting only on the slots they need.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dashmap::DashMap;
use fnv::FnvBuildHasher;
use once_cell::sync::OnceCell;
use tracing::{debug, error, trace, warn};

use super::segment::PathSegment;
use super::signal::OneShot;
use super::END_OF_TREE;
use crate::config::{global_config, CodecConfig};
use crate::data_structures::prefixed_tree::{NodeId, SEPARATOR};
use crate::error::{CodecError, CodecErrorKind, CodecResult};
use crate::protocol::stream::{CloseableReadContext, ReadContext};

type Slot = Arc<OneShot<PathSegment>>;

/// State shared between the worker and readers.
#[derive(Debug)]
struct SharedTable {
    /// Resolution slot per node id
    slots: DashMap<NodeId, Slot, FnvBuildHasher>,

    /// Upper bound on the number of resolved slots
    resolved: AtomicUsize,

    /// Set when the worker exits, successfully or not
    worker_done: OneShot<()>,

    /// How the worker ended; unset if it panicked
    outcome: OnceCell<Result<usize, (CodecErrorKind, String)>>,
}

impl SharedTable {
    fn new() -> Self {
        Self {
            slots: DashMap::with_hasher(FnvBuildHasher::default()),
            resolved: AtomicUsize::new(0),
            worker_done: OneShot::new(),
            outcome: OnceCell::new(),
        }
    }

    /// Returns the slot for `id`, inserting a pending one if absent.
    fn slot(&self, id: NodeId) -> Slot {
        if let Some(slot) = self.slots.get(&id) {
            return Arc::clone(slot.value());
        }
        self.slots
            .entry(id)
            .or_insert_with(|| Arc::new(OneShot::new()))
            .value()
            .clone()
    }
}

/// Marks the worker as done when dropped, including on panic.
struct WorkerExit(Arc<SharedTable>);

impl Drop for WorkerExit {
    fn drop(&mut self) {
        let _ = self.0.worker_done.set(());
    }
}

/// Resolves node ids from a persisted prefixed tree.
///
/// Construction starts the background worker; [`close`](Self::close) joins
/// it. Every blocking wait is bounded by the configured timeout.
#[derive(Debug)]
pub struct TreeDecoder {
    shared: Arc<SharedTable>,
    worker: Option<JoinHandle<CodecResult<usize>>>,
    timeout: Duration,
}

impl TreeDecoder {
    /// Starts decoding `context` with the global codec configuration.
    pub fn new<C>(context: C) -> CodecResult<Self>
    where
        C: CloseableReadContext + Send + 'static,
    {
        Self::with_config(context, &global_config().codec)
    }

    /// Starts decoding `context` on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// * `CodecError::Io` - if the worker thread cannot be spawned
    pub fn with_config<C>(context: C, config: &CodecConfig) -> CodecResult<Self>
    where
        C: CloseableReadContext + Send + 'static,
    {
        let shared = Arc::new(SharedTable::new());
        let exit = WorkerExit(Arc::clone(&shared));

        let worker = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || {
                let exit = exit;
                decode_tree(context, &exit.0)
            })?;

        debug!(thread = %config.worker_thread_name, "prefixed tree decoder started");

        Ok(Self {
            shared,
            worker: Some(worker),
            timeout: config.timeout(),
        })
    }

    /// Reads a node id from `context` and resolves it into its path.
    pub fn read_path<R>(&self, context: &mut R) -> CodecResult<PathBuf>
    where
        R: ReadContext + ?Sized,
    {
        let id = node_id(context.read_small_int()?)?;
        self.resolve(id)
    }

    /// Resolves `id` into its absolute path.
    ///
    /// Blocks on each ancestor not yet decoded, for at most the configured
    /// timeout per ancestor.
    ///
    /// # Errors
    ///
    /// * `CodecError::ResolveTimeout` - if an id on the chain never arrives
    /// * `CodecError::ParentCycle` - if the chain loops
    pub fn resolve(&self, id: NodeId) -> CodecResult<PathBuf> {
        let mut segments = Vec::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if segments.len() > self.shared.resolved.load(Ordering::Acquire) {
                return Err(CodecError::ParentCycle { id });
            }

            let slot = self.shared.slot(current);
            let entry = slot
                .wait_for(self.timeout)
                .ok_or(CodecError::ResolveTimeout {
                    id: current,
                    timeout: self.timeout,
                })?;
            segments.push(entry.segment.clone());
            next = entry.parent;
        }

        Ok(join_reversed(&segments))
    }

    /// Waits for the whole tree to be decoded and returns the path of every
    /// final node.
    ///
    /// # Errors
    ///
    /// * `CodecError::JoinTimeout` - if the worker is still running after the timeout
    /// * `CodecError::WorkerFailed` - if the worker stopped before the end of the tree
    /// * `CodecError::WorkerPanicked` - if the worker panicked
    pub fn materialize(&self) -> CodecResult<HashMap<NodeId, PathBuf>> {
        if self.shared.worker_done.wait_for(self.timeout).is_none() {
            return Err(CodecError::JoinTimeout {
                timeout: self.timeout,
            });
        }

        match self.shared.outcome.get() {
            Some(Ok(_)) => {}
            Some(Err((kind, message))) => {
                return Err(CodecError::WorkerFailed {
                    kind: *kind,
                    message: message.clone(),
                })
            }
            None => return Err(CodecError::WorkerPanicked),
        }

        let finals: Vec<NodeId> = self
            .shared
            .slots
            .iter()
            .filter(|entry| entry.value().get().is_some_and(|segment| segment.is_final))
            .map(|entry| *entry.key())
            .collect();

        finals
            .into_iter()
            .map(|id| self.resolve(id).map(|path| (id, path)))
            .collect()
    }

    /// Returns the number of nodes decoded so far.
    pub fn decoded_count(&self) -> usize {
        self.shared.resolved.load(Ordering::Acquire)
    }

    /// Joins the worker and returns the number of nodes it decoded.
    ///
    /// # Errors
    ///
    /// * `CodecError::JoinTimeout` - if the worker is still running after the timeout
    /// * `CodecError::WorkerPanicked` - if the worker panicked
    /// * any error the worker stopped on
    pub fn close(mut self) -> CodecResult<usize> {
        let Some(worker) = self.worker.take() else {
            return Ok(self.decoded_count());
        };

        if self.shared.worker_done.wait_for(self.timeout).is_none() {
            error!(timeout = ?self.timeout, "prefixed tree decoder worker did not finish");
            return Err(CodecError::JoinTimeout {
                timeout: self.timeout,
            });
        }

        worker.join().map_err(|_| CodecError::WorkerPanicked)?
    }
}

impl Drop for TreeDecoder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            warn!("prefixed tree decoder dropped without close, detaching worker");
        }
    }
}

/// Worker body: decodes every node, then closes the stream.
fn decode_tree<C: CloseableReadContext>(mut context: C, shared: &SharedTable) -> CodecResult<usize> {
    let decoded = publish_nodes(&mut context, shared);
    let closed = context.close();

    let result = match (decoded, closed) {
        (Ok(nodes), Ok(())) => {
            debug!(nodes, "prefixed tree decoded");
            Ok(nodes)
        }
        (Err(err), _) | (Ok(_), Err(err)) => {
            error!(error = %err, "prefixed tree decoding failed");
            Err(err)
        }
    };

    let _ = shared.outcome.set(match &result {
        Ok(nodes) => Ok(*nodes),
        Err(err) => Err((err.kind(), err.to_string())),
    });
    result
}

fn publish_nodes<C: ReadContext>(context: &mut C, shared: &SharedTable) -> CodecResult<usize> {
    let mut nodes = 0;
    loop {
        let raw = context.read_small_int()?;
        if raw == END_OF_TREE {
            return Ok(nodes);
        }

        let id = node_id(raw)?;
        let is_final = context.read_boolean()?;
        let segment = context.read_string()?;
        let parent = context.read_nullable_small_int()?.map(node_id).transpose()?;
        trace!(id, ?parent, %segment, "decoded tree node");

        // Counted before publishing so readers never see more resolved
        // slots than the count admits.
        shared.resolved.fetch_add(1, Ordering::AcqRel);
        shared
            .slot(id)
            .set(PathSegment {
                is_final,
                segment,
                parent,
            })
            .map_err(|_| CodecError::DuplicateResolution { id })?;
        nodes += 1;
    }
}

fn node_id(raw: i32) -> CodecResult<NodeId> {
    NodeId::try_from(raw).map_err(|_| CodecError::InvalidNodeId(raw))
}

fn join_reversed(segments: &[String]) -> PathBuf {
    let mut path = String::new();
    for segment in segments.iter().rev().filter(|s| !s.is_empty()) {
        path.push(SEPARATOR);
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push(SEPARATOR);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::stream::{StreamReader, StreamWriter, WriteContext};
    use std::io::Cursor;
    use std::time::Instant;

    fn config(timeout: Duration) -> CodecConfig {
        CodecConfig::default().with_timeout(timeout)
    }

    fn stream(write: impl FnOnce(&mut StreamWriter<Vec<u8>>)) -> StreamReader<Cursor<Vec<u8>>> {
        let mut writer = StreamWriter::new(Vec::new());
        write(&mut writer);
        StreamReader::new(Cursor::new(writer.into_inner().unwrap()))
    }

    fn node(w: &mut StreamWriter<Vec<u8>>, id: i32, is_final: bool, segment: &str, parent: Option<i32>) {
        w.write_small_int(id).unwrap();
        w.write_boolean(is_final).unwrap();
        w.write_string(segment).unwrap();
        w.write_nullable_small_int(parent).unwrap();
    }

    #[test]
    fn test_join_reversed() {
        let segments = vec!["Foo".to_string(), "foo".to_string(), "org/example".to_string()];
        assert_eq!(join_reversed(&segments), PathBuf::from("/org/example/foo/Foo"));
        assert_eq!(join_reversed(&["".to_string()]), PathBuf::from("/"));
    }

    #[test]
    fn test_resolves_parent_chain() {
        let input = stream(|w| {
            node(w, 2, false, "org/example", None);
            node(w, 4, true, "foo/Foo", Some(2));
            node(w, 5, true, "bar", Some(2));
            w.write_small_int(END_OF_TREE).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        assert_eq!(decoder.resolve(4).unwrap(), PathBuf::from("/org/example/foo/Foo"));
        assert_eq!(decoder.resolve(5).unwrap(), PathBuf::from("/org/example/bar"));
        assert_eq!(decoder.close().unwrap(), 3);
    }

    #[test]
    fn test_materialize_returns_final_nodes() {
        let input = stream(|w| {
            node(w, 2, false, "org/example", None);
            node(w, 4, true, "foo/Foo", Some(2));
            node(w, 5, true, "bar", Some(2));
            w.write_small_int(END_OF_TREE).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        let paths = decoder.materialize().unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[&4], PathBuf::from("/org/example/foo/Foo"));
        assert_eq!(paths[&5], PathBuf::from("/org/example/bar"));
        decoder.close().unwrap();
    }

    #[test]
    fn test_unknown_id_times_out() {
        let input = stream(|w| {
            node(w, 1, true, "a", None);
            w.write_small_int(END_OF_TREE).unwrap();
        });

        let timeout = Duration::from_millis(50);
        let decoder = TreeDecoder::with_config(input, &config(timeout)).unwrap();
        let started = Instant::now();
        let err = decoder.resolve(9).unwrap_err();
        assert!(started.elapsed() >= timeout);
        assert!(matches!(err, CodecError::ResolveTimeout { id: 9, .. }));
        decoder.close().unwrap();
    }

    #[test]
    fn test_duplicate_id_fails_worker() {
        let input = stream(|w| {
            node(w, 1, true, "a", None);
            node(w, 1, true, "b", None);
            w.write_small_int(END_OF_TREE).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        assert!(matches!(
            decoder.close(),
            Err(CodecError::DuplicateResolution { id: 1 })
        ));
    }

    #[test]
    fn test_truncated_stream_fails_worker() {
        let input = stream(|w| {
            node(w, 1, true, "a", None);
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        assert_eq!(decoder.resolve(1).unwrap(), PathBuf::from("/a"));
        assert!(matches!(decoder.close(), Err(CodecError::Io(_))));
    }

    #[test]
    fn test_materialize_rejects_truncated_stream() {
        let input = stream(|w| {
            node(w, 1, true, "a", None);
            w.write_small_int(2).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        let err = decoder.materialize().unwrap_err();
        assert!(matches!(
            err,
            CodecError::WorkerFailed {
                kind: CodecErrorKind::Io,
                ..
            }
        ));
        assert!(matches!(decoder.close(), Err(CodecError::Io(_))));
    }

    #[test]
    fn test_materialize_rejects_corrupt_stream() {
        let input = stream(|w| {
            node(w, 1, true, "a", None);
            node(w, -7, true, "b", Some(1));
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        let err = decoder.materialize().unwrap_err();
        assert_eq!(err.kind(), CodecErrorKind::Corruption);
        assert!(err.to_string().contains("-7"));
        assert!(matches!(decoder.close(), Err(CodecError::InvalidNodeId(-7))));
    }

    #[test]
    fn test_negative_id_is_corruption() {
        let input = stream(|w| {
            node(w, -3, true, "a", None);
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        assert!(matches!(decoder.close(), Err(CodecError::InvalidNodeId(-3))));
    }

    #[test]
    fn test_parent_cycle_is_detected() {
        let input = stream(|w| {
            node(w, 1, false, "a", Some(2));
            node(w, 2, true, "b", Some(1));
            w.write_small_int(END_OF_TREE).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        decoder.materialize().unwrap_err();
        assert!(matches!(decoder.resolve(2), Err(CodecError::ParentCycle { id: 2 })));
        decoder.close().unwrap();
    }

    #[test]
    fn test_read_path_reads_id_from_stream() {
        let input = stream(|w| {
            node(w, 0, true, "", None);
            node(w, 1, true, "tmp", Some(0));
            w.write_small_int(END_OF_TREE).unwrap();
        });
        let mut refs = stream(|w| {
            w.write_small_int(1).unwrap();
            w.write_small_int(0).unwrap();
        });

        let decoder = TreeDecoder::with_config(input, &config(Duration::from_secs(5))).unwrap();
        assert_eq!(decoder.read_path(&mut refs).unwrap(), PathBuf::from("/tmp"));
        assert_eq!(decoder.read_path(&mut refs).unwrap(), PathBuf::from("/"));
        decoder.close().unwrap();
    }
}
