//! Codec error module.
//!
//! This module defines error types that may occur while encoding or decoding
//! a prefixed path tree, including stream corruption, protocol violations by
//! callers, and bounded-wait timeouts.

use std::time::Duration;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Broad classification of a [`CodecError`].
///
/// None of these are retried internally; the only recovery is discarding the
/// persisted cache and rebuilding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// A caller broke the encoder/decoder usage contract.
    ProtocolViolation,
    /// A bounded wait elapsed before the awaited value arrived.
    Timeout,
    /// The persisted stream is truncated or malformed.
    Corruption,
    /// The underlying byte stream failed.
    Io,
}

/// Errors that can occur during tree encoding and decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Error from the underlying byte stream.
    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A variable-length integer did not terminate within its maximum width.
    #[error("Malformed variable-length integer")]
    MalformedVarint,

    /// A decoded integer does not fit the expected range.
    #[error("Integer {value} is out of range for {context}")]
    ValueOutOfRange {
        /// The decoded value
        value: i64,
        /// What the value was being decoded as
        context: &'static str,
    },

    /// A boolean byte other than 0 or 1.
    #[error("Invalid boolean byte: {0:#04x}")]
    InvalidBoolean(u8),

    /// A string payload that is not valid UTF-8.
    #[error("Invalid UTF-8 in string payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A string length prefix larger than the configured maximum.
    #[error("String length {len} exceeds maximum of {max} bytes")]
    StringTooLong {
        /// The declared length
        len: u64,
        /// The configured maximum
        max: usize,
    },

    /// A negative node id other than the end-of-tree sentinel.
    #[error("Invalid node id in tree stream: {0}")]
    InvalidNodeId(i32),

    /// A parent chain that loops back on itself.
    #[error("Parent chain of node {id} does not terminate")]
    ParentCycle {
        /// The id whose resolution was requested
        id: u32,
    },

    /// `finish` was called on an encoder that already finished.
    #[error("Tree encoder has already been finished")]
    AlreadyFinished,

    /// A reference was recorded after the tree was written.
    #[error("Cannot record reference to {path:?} after the tree has been finished")]
    ReferenceAfterFinish {
        /// The path that was being recorded
        path: String,
    },

    /// The encoder was dropped before the tree was written.
    #[error("Tree encoder was dropped without writing the tree ({nodes} nodes lost)")]
    Unfinished {
        /// Number of nodes that were never persisted
        nodes: usize,
    },

    /// The decoder worker observed a second entry for an id.
    #[error("Duplicate resolution for node {id}")]
    DuplicateResolution {
        /// The id that appeared twice in the stream
        id: u32,
    },

    /// A node id was not resolved within the bounded wait.
    #[error("Timed out after {timeout:?} waiting for node {id}")]
    ResolveTimeout {
        /// The unresolved id
        id: u32,
        /// How long the reader waited
        timeout: Duration,
    },

    /// The decoder worker did not finish within the bounded wait.
    #[error("Timed out after {timeout:?} joining the tree decoder worker")]
    JoinTimeout {
        /// How long the join waited
        timeout: Duration,
    },

    /// The decoder worker panicked.
    #[error("Tree decoder worker panicked")]
    WorkerPanicked,

    /// The decoder worker stopped on an error before the end of the tree.
    #[error("Tree decoder worker failed: {message}")]
    WorkerFailed {
        /// Classification of the error the worker stopped on
        kind: CodecErrorKind,
        /// Display text of that error
        message: String,
    },
}

impl CodecError {
    /// Returns the broad classification of this error.
    pub fn kind(&self) -> CodecErrorKind {
        match self {
            Self::Io(_) => CodecErrorKind::Io,
            Self::WorkerFailed { kind, .. } => *kind,
            Self::ResolveTimeout { .. } | Self::JoinTimeout { .. } => CodecErrorKind::Timeout,
            Self::AlreadyFinished
            | Self::ReferenceAfterFinish { .. }
            | Self::Unfinished { .. }
            | Self::DuplicateResolution { .. }
            | Self::WorkerPanicked => CodecErrorKind::ProtocolViolation,
            Self::MalformedVarint
            | Self::ValueOutOfRange { .. }
            | Self::InvalidBoolean(_)
            | Self::InvalidUtf8(_)
            | Self::StringTooLong { .. }
            | Self::InvalidNodeId(_)
            | Self::ParentCycle { .. } => CodecErrorKind::Corruption,
        }
    }
}

impl From<leb128::read::Error> for CodecError {
    fn from(err: leb128::read::Error) -> Self {
        match err {
            leb128::read::Error::IoError(e) => Self::Io(e),
            leb128::read::Error::Overflow => Self::MalformedVarint,
        }
    }
}
