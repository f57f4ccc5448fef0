//! Mauka Paths - command-line entrypoint.
//!
//! Packs a list of paths into a prefixed-tree cache directory and unpacks it
//! again, mainly for inspecting and benchmarking persisted caches.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;

use clap::{Parser, Subcommand};
use mauka_paths_lib::config::{self, CodecConfig, ConfigLoader, LogConfig, PathsConfig};
use mauka_paths_lib::data_structures::NodeId;
use mauka_paths_lib::error::{
    set_error_reporter, CodecError, CodecResult, PathsError, PathsResult, TracingErrorReporter,
};
use mauka_paths_lib::protocol::stream::{
    CloseableWriteContext, ReadContext, StreamReader, StreamWriter, WriteContext,
};
use mauka_paths_lib::protocol::tree::{TreeDecoder, TreeEncoder};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// File holding the reference count followed by one node id per reference.
const REFS_FILE: &str = "refs.bin";

/// File holding the persisted tree block.
const TREE_FILE: &str = "tree.bin";

/// Command line arguments for Mauka Paths.
#[derive(Parser, Debug)]
#[clap(name = "mauka_paths", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Record every line of a text file as a path reference
    Pack {
        /// Text file with one path per line
        #[clap(short, long, value_parser)]
        input: PathBuf,

        /// Cache directory to create
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },

    /// Resolve every reference of a packed cache back into its path
    Unpack {
        /// Cache directory written by `pack`
        #[clap(short, long, value_parser)]
        cache: PathBuf,

        /// Print a JSON array instead of one path per line
        #[clap(long)]
        json: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Initialize the logging system.
fn init_logging(log: &LogConfig) -> PathsResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(log.source_location)
        .with_file(log.source_location)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    let installed = if log.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed
        .map_err(|e| PathsError::Custom(format!("Failed to set global tracing subscriber: {e}")))
}

fn main() -> PathsResult<()> {
    let args = Args::parse();

    let config = match ConfigLoader::new(args.config.as_deref(), config::ENV_PREFIX).load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    init_logging(&config.log)?;
    set_error_reporter(Arc::new(TracingErrorReporter));
    config::init_global_config(config.clone());

    match args.command {
        Command::Pack { input, output } => pack(&input, &output, &config.codec),
        Command::Unpack { cache, json } => unpack(&cache, json, &config.codec),
        Command::Validate => {
            info!("Configuration validated successfully");
            Ok(())
        }
        Command::GenConfig { output } => gen_config(&output),
    }
}

fn pack(input: &Path, output: &Path, codec: &CodecConfig) -> PathsResult<()> {
    let contents = fs::read_to_string(input)?;
    let paths: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let count = i32::try_from(paths.len())
        .map_err(|_| PathsError::Custom(format!("Too many paths: {}", paths.len())))?;

    fs::create_dir_all(output)?;
    let tree_file = File::create(output.join(TREE_FILE))?;
    let encoder = TreeEncoder::new(StreamWriter::with_capacity(codec.buffer_size, tree_file));

    let mut refs =
        StreamWriter::with_capacity(codec.buffer_size, File::create(output.join(REFS_FILE))?);
    refs.write_small_int(count)?;
    for path in &paths {
        encoder.record_reference(&mut refs, path)?;
    }
    refs.close()?;

    let nodes = encoder.finish()?;
    info!(
        references = paths.len(),
        tree_nodes = encoder.tree().node_count(),
        written_nodes = nodes,
        "Cache packed into {:?}",
        output
    );
    Ok(())
}

fn unpack(cache: &Path, json: bool, codec: &CodecConfig) -> PathsResult<()> {
    let tree = StreamReader::with_capacity(codec.buffer_size, File::open(cache.join(TREE_FILE))?)
        .with_max_string_bytes(codec.max_string_bytes);
    let decoder = TreeDecoder::with_config(tree, codec)?;

    let mut refs =
        StreamReader::with_capacity(codec.buffer_size, File::open(cache.join(REFS_FILE))?);
    let count = refs.read_small_int()?;
    let count = usize::try_from(count)
        .map_err(|_| PathsError::Custom(format!("Invalid reference count: {count}")))?;

    let paths = if codec.reader_threads <= 1 {
        (0..count)
            .map(|_| decoder.read_path(&mut refs))
            .collect::<CodecResult<Vec<_>>>()?
    } else {
        let ids = (0..count)
            .map(|_| {
                let raw = refs.read_small_int()?;
                NodeId::try_from(raw).map_err(|_| CodecError::InvalidNodeId(raw))
            })
            .collect::<CodecResult<Vec<_>>>()?;
        resolve_concurrently(&decoder, &ids, codec.reader_threads)?
    };

    let nodes = decoder.close()?;
    info!(references = count, decoded_nodes = nodes, "Cache unpacked");

    let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for path in rendered {
            println!("{path}");
        }
    }
    Ok(())
}

/// Resolves `ids` in order, split across `threads` reader threads.
fn resolve_concurrently(
    decoder: &TreeDecoder,
    ids: &[NodeId],
    threads: usize,
) -> PathsResult<Vec<PathBuf>> {
    let chunk_size = ids.len().div_ceil(threads).max(1);

    thread::scope(|scope| {
        let readers: Vec<_> = ids
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|&id| decoder.resolve(id))
                        .collect::<CodecResult<Vec<_>>>()
                })
            })
            .collect();

        let mut paths = Vec::with_capacity(ids.len());
        for reader in readers {
            let resolved = reader
                .join()
                .map_err(|_| PathsError::Custom("Reader thread panicked".to_string()))??;
            paths.extend(resolved);
        }
        Ok(paths)
    })
}

fn gen_config(output: &Path) -> PathsResult<()> {
    info!("Generating default configuration");

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let toml = toml::to_string_pretty(&PathsConfig::default())
        .map_err(|e| PathsError::Custom(format!("Failed to serialize config: {e}")))?;
    fs::write(output, toml)?;

    info!("Default configuration written to {:?}", output);
    Ok(())
}
