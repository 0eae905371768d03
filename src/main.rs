use std::path::{Path, PathBuf};
use std::process;

use aif_modelgen::codegen::{self, CollisionPolicy, DEFAULT_MAX_DEPTH, DEFAULT_ROOT_NAME, GenerateOptions};
use aif_modelgen::contracts::{self, ContractStore};
use aif_modelgen::engine::{self, NativeEngine, SchemaEngine};
use aif_modelgen::error::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Infer JSON schemas from example data, version them as contracts, and
/// generate Pydantic models from them.
#[derive(Parser)]
#[command(name = "aif-modelgen", version, about)]
struct Cli {
    /// Directory holding current.json and frozen contract versions.
    #[arg(long, global = true, default_value = "contracts", env = "AIF_CONTRACTS_DIR")]
    contracts_dir: PathBuf,

    /// Suppress non-error output.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer a schema from a JSON array, a single JSON document, or JSONL.
    Learn {
        /// File with example records.
        file: PathBuf,

        /// Where to save the schema (default: <contracts-dir>/current.json).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Freeze a schema as a named contract version.
    Freeze {
        /// Schema to freeze (default: <contracts-dir>/current.json).
        #[arg(long)]
        src: Option<PathBuf>,

        /// Version name (default: UTC timestamp like v20240131120000).
        #[arg(long = "contract-version")]
        contract_version: Option<String>,
    },

    /// Show fields added, removed, and shared between two schemas.
    Diff {
        /// Old schema.
        a: PathBuf,
        /// New schema.
        b: PathBuf,
    },

    /// Generate Pydantic models from a schema.
    Codegen {
        /// Schema file (default: <contracts-dir>/current.json).
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Output file, or "-" for stdout.
        #[arg(long, default_value = "models.py")]
        out: PathBuf,

        /// Name of the root model class.
        #[arg(long, default_value = DEFAULT_ROOT_NAME)]
        root_name: String,

        /// Fail when properties/items nest deeper than this.
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// On class name collisions keep only the last definition instead of
        /// renaming it.
        #[arg(long)]
        overwrite_collisions: bool,
    },

    /// Download a schema document and store it locally.
    #[cfg(feature = "download")]
    DownloadSchema {
        /// URL of the schema document.
        #[arg(long, env = "AIF_SCHEMA_URL")]
        url: String,

        /// Where to save the schema (default: <contracts-dir>/current.json).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let store = ContractStore::new(cli.contracts_dir);

    match cli.command {
        Commands::Learn { file, out } => {
            let samples = engine::samples_from_text(&contracts::read_text(&file)?);
            info!(samples = samples.len(), file = %file.display(), "loaded samples");

            let schema_text = NativeEngine.infer_schema(&samples)?;
            let schema: Value = serde_json::from_str(&schema_text)?;

            let out = out.unwrap_or_else(|| store.current_path());
            store.write_schema(&out, &schema)?;
        }

        Commands::Freeze {
            src,
            contract_version,
        } => {
            let src = src.unwrap_or_else(|| store.current_path());
            let target = store.freeze(&src, contract_version.as_deref())?;
            info!(path = %target.display(), "frozen");
        }

        Commands::Diff { a, b } => {
            let diff = NativeEngine
                .diff_schemas(&contracts::read_text(&a)?, &contracts::read_text(&b)?)?;
            println!("{}", serde_json::to_string_pretty(&diff)?);
        }

        Commands::Codegen {
            schema,
            out,
            root_name,
            max_depth,
            overwrite_collisions,
        } => {
            let schema_path = schema.unwrap_or_else(|| store.current_path());
            info!(path = %schema_path.display(), "loading schema");
            let schema = store.read_schema(&schema_path)?;

            let options = GenerateOptions {
                max_depth,
                collisions: if overwrite_collisions {
                    CollisionPolicy::Overwrite
                } else {
                    CollisionPolicy::Disambiguate
                },
            };
            let generation = codegen::generate_with(&schema, &root_name, &options)?;
            let stats = &generation.stats;

            if out == Path::new("-") {
                print!("{}", generation.code);
            } else {
                store.write_code(&out, &generation.code)?;
            }

            info!(
                classes = stats.classes_generated,
                fields = stats.fields_generated,
                "generated"
            );
            if stats.collisions > 0 {
                warn!(collisions = stats.collisions, "class name collisions");
            }
            if stats.unknown_types_defaulted > 0 {
                info!(
                    count = stats.unknown_types_defaulted,
                    "defaulted unknown types to Any"
                );
            }
        }

        #[cfg(feature = "download")]
        Commands::DownloadSchema { url, out } => {
            let out = out.unwrap_or_else(|| store.current_path());
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| aif_modelgen::error::Error::Download(e.to_string()))?;
            rt.block_on(aif_modelgen::schema::download_schema(&url, &out))?;
        }
    }

    Ok(())
}
