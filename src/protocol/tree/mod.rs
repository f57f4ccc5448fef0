// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Persisted form of a prefixed path tree.
//!
//! The tree block is written once, after every reference has been recorded:
//!
//! ```text
//! tree := node* EOF
//! node := id:small_int  is_final:bool  segment:string  parent:nullable_small_int
//! EOF  := small_int(-1)
//! ```
//!
//! Nodes are written parent-first, so a reader walking a parent chain only
//! ever waits for entries that are still to come.
//!
//! # Example
//!
//! ```
//! use std::fs::File;
//! use std::io::Cursor;
//! use std::path::PathBuf;
//! use mauka_paths_lib::protocol::stream::{StreamReader, StreamWriter};
//! use mauka_paths_lib::protocol::tree::{TreeDecoder, TreeEncoder};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let tree_path = dir.path().join("tree.bin");
//!
//! let encoder = TreeEncoder::new(StreamWriter::new(File::create(&tree_path).unwrap()));
//! let mut refs = StreamWriter::new(Vec::new());
//! encoder.record_reference(&mut refs, "org/example/Foo").unwrap();
//! encoder.finish().unwrap();
//!
//! let decoder = TreeDecoder::new(StreamReader::new(File::open(&tree_path).unwrap())).unwrap();
//! let mut refs = StreamReader::new(Cursor::new(refs.into_inner().unwrap()));
//! assert_eq!(decoder.read_path(&mut refs).unwrap(), PathBuf::from("/org/example/Foo"));
//! assert_eq!(decoder.close().unwrap(), 1);
//! ```

mod decoder;
mod encoder;
mod segment;
mod signal;

pub use decoder::TreeDecoder;
pub use encoder::{write_tree, TreeEncoder};
pub use segment::PathSegment;
pub use signal::OneShot;

/// Small int marking the end of the tree block.
pub const END_OF_TREE: i32 = -1;
