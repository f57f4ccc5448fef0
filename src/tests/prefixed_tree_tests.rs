//! Property-based tests for the prefixed tree and its persisted form.

use super::{path_set_strategy, path_strategy};
use crate::config::CodecConfig;
use crate::data_structures::prefixed_tree::{build_index_map, NodeId, PrefixedTree};
use crate::protocol::stream::{StreamReader, StreamWriter};
use crate::protocol::tree::{write_tree, TreeDecoder};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

fn absolute(path: &str) -> PathBuf {
    PathBuf::from(format!("/{path}"))
}

fn record(paths: &[String]) -> (PrefixedTree, Vec<NodeId>) {
    let tree = PrefixedTree::new();
    let ids = paths.iter().map(|path| tree.insert(path)).collect();
    (tree, ids)
}

fn decoder_for(tree: &PrefixedTree) -> TreeDecoder {
    let mut writer = StreamWriter::new(Vec::new());
    write_tree(&mut writer, &tree.compress()).unwrap();
    let bytes = writer.into_inner().unwrap();

    let config = CodecConfig::default().with_timeout(Duration::from_secs(5));
    TreeDecoder::with_config(StreamReader::new(Cursor::new(bytes)), &config).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_insert_is_idempotent(path in path_strategy()) {
        let tree = PrefixedTree::new();
        let first = tree.insert(&path);
        let count = tree.node_count();

        prop_assert_eq!(tree.insert(&path), first);
        prop_assert_eq!(tree.node_count(), count);
    }

    #[test]
    fn prop_distinct_paths_get_distinct_ids(paths in path_set_strategy()) {
        let (_, ids) = record(&paths);

        let mut by_id: HashMap<NodeId, &String> = HashMap::new();
        for (path, id) in paths.iter().zip(&ids) {
            let previous = by_id.insert(*id, path);
            prop_assert!(previous.map_or(true, |p| p == path));
        }
    }

    #[test]
    fn prop_ids_are_dense(paths in path_set_strategy()) {
        let (tree, _) = record(&paths);
        let indexes = tree.build_indexes();

        prop_assert_eq!(indexes.len(), tree.node_count());
        for id in 0..tree.node_count() as NodeId {
            prop_assert!(indexes.contains_key(&id));
        }
    }

    #[test]
    fn prop_compression_preserves_final_paths(paths in path_set_strategy()) {
        let (tree, ids) = record(&paths);
        let compressed = build_index_map(&tree.compress());

        for (path, id) in paths.iter().zip(&ids) {
            prop_assert_eq!(compressed.get(id), Some(&absolute(path)));
        }
        prop_assert!(tree.compress().node_count() <= tree.node_count());
    }

    #[test]
    fn prop_decoded_paths_match_recorded(paths in path_set_strategy()) {
        let (tree, ids) = record(&paths);
        let decoder = decoder_for(&tree);

        for (path, id) in paths.iter().zip(&ids) {
            prop_assert_eq!(decoder.resolve(*id).unwrap(), absolute(path));
        }

        let written = tree.compress().node_count();
        prop_assert_eq!(decoder.close().unwrap(), written);
    }

    #[test]
    fn prop_materialize_covers_every_final_node(paths in path_set_strategy()) {
        let (tree, ids) = record(&paths);
        let decoder = decoder_for(&tree);

        let materialized = decoder.materialize().unwrap();
        for (path, id) in paths.iter().zip(&ids) {
            prop_assert_eq!(materialized.get(id), Some(&absolute(path)));
        }
        decoder.close().unwrap();
    }
}
