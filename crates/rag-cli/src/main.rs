//! RAG CLI - Command-line interface for the RAG table manager.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rag_core::{RagConfig, RagError, Record, Result, Value};
use rag_embed::{HashingVectorizer, IdentityVectorizer};
use rag_store::SqliteStore;
use rag_table::{read_backup, RagTableManager};

/// RAG - table manager with vectorizers and similarity search
#[derive(Parser)]
#[command(name = "rag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: user config dir, then ./rag-table.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding the config
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and table
    Init,

    /// Add a record given as a JSON object
    Add {
        /// Record JSON, e.g. '{"id": "1", "title": "hello"}'
        json: String,

        /// Vectorizer used to fill the vector column
        #[arg(long)]
        vectorizer: Option<String>,
    },

    /// Add every record of a .json or .jsonl file
    Import {
        path: PathBuf,

        #[arg(long)]
        vectorizer: Option<String>,
    },

    /// Print the record with the given identifier
    Get { id: String },

    /// Update the record with the given identifier
    Update {
        id: String,

        /// Columns to assign, as a JSON object
        json: String,

        #[arg(long)]
        vectorizer: Option<String>,
    },

    /// Delete the record with the given identifier
    Delete { id: String },

    /// Run a query verbatim against the store
    Query { sql: String },

    /// Rank records by cosine similarity
    Similar {
        /// Query vector as a JSON array
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        vector: Option<String>,

        /// Query text, vectorized with --vectorizer
        #[arg(long, requires = "vectorizer")]
        text: Option<String>,

        #[arg(long)]
        vectorizer: Option<String>,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Columns to return (all if not specified)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Write every record to a .json or .jsonl file
    Backup { path: PathBuf },

    /// Replace the table contents with a backup file
    Restore { path: PathBuf },

    /// Drop and recreate the table
    Reset,
}

fn setup_logging(verbose: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
        return;
    }

    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = match &cli.config {
        Some(path) => RagConfig::load(path)?,
        None => RagConfig::load_default()?,
    };
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(&cli)?;

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn open_manager(config: &RagConfig) -> Result<RagTableManager> {
    let store = Arc::new(SqliteStore::open_with_config(&config.database)?);
    let mut manager = RagTableManager::from_config(store, config).await?;
    register_vectorizers(&mut manager, config)?;
    Ok(manager)
}

fn register_vectorizers(manager: &mut RagTableManager, config: &RagConfig) -> Result<()> {
    let dimension = manager
        .table()
        .schema
        .vector_column()?
        .and_then(|c| c.column_type.dimension())
        .unwrap_or(config.vectorizer.hashing_dimension);

    manager.add_vectorizer("hashing", Arc::new(HashingVectorizer::new(dimension)?));
    manager.add_vectorizer("identity", Arc::new(IdentityVectorizer::new()));
    register_onnx(manager, config)
}

#[cfg(feature = "onnx")]
fn register_onnx(manager: &mut RagTableManager, config: &RagConfig) -> Result<()> {
    if let (Some(model), Some(tokenizer)) = (
        &config.vectorizer.model_path,
        &config.vectorizer.tokenizer_path,
    ) {
        let vectorizer = rag_embed::OnnxVectorizer::new(model, tokenizer)?;
        manager.add_vectorizer("onnx", Arc::new(vectorizer));
    }
    Ok(())
}

#[cfg(not(feature = "onnx"))]
fn register_onnx(_manager: &mut RagTableManager, _config: &RagConfig) -> Result<()> {
    Ok(())
}

/// Parse an identifier argument as the identifier column's type.
fn parse_id(manager: &RagTableManager, id: &str) -> Result<Value> {
    manager.table().identifier()?.column_type.parse_literal(id)
}

fn parse_record(json: &str) -> Result<Record> {
    serde_json::from_str(json)
        .map_err(|e| RagError::invalid_argument(format!("record must be a JSON object: {}", e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands, config: &RagConfig) -> Result<()> {
    let mut manager = open_manager(config).await?;

    match command {
        Commands::Init => {
            println!(
                "Initialized table '{}' at: {}",
                manager.table().name,
                config.database.path.display()
            );
        }
        Commands::Add { json, vectorizer } => {
            manager
                .add_data(parse_record(&json)?, vectorizer.as_deref())
                .await?;
            println!("Added 1 record");
        }
        Commands::Import { path, vectorizer } => {
            let records = read_backup(&path)?;
            let count = manager
                .add_bulk_data(records, vectorizer.as_deref())
                .await?;
            println!("Imported {} records from {}", count, path.display());
        }
        Commands::Get { id } => {
            let id = parse_id(&manager, &id)?;
            match manager.get_data(id.clone()).await? {
                Some(record) => print_json(&record)?,
                None => {
                    eprintln!("No record with identifier {}", id);
                    std::process::exit(1);
                }
            }
        }
        Commands::Update {
            id,
            json,
            vectorizer,
        } => {
            let id = parse_id(&manager, &id)?;
            manager
                .update_data(id.clone(), parse_record(&json)?, vectorizer.as_deref())
                .await?;
            println!("Updated {}", id);
        }
        Commands::Delete { id } => {
            let id = parse_id(&manager, &id)?;
            manager.delete_data(id.clone()).await?;
            println!("Deleted {}", id);
        }
        Commands::Query { sql } => {
            for record in manager.search(&sql).await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Commands::Similar {
            vector,
            text,
            vectorizer,
            top_k,
            columns,
        } => {
            let top_k = top_k
                .unwrap_or(config.search.default_top_k)
                .min(config.search.max_top_k);
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();

            let results = match (vector, text, vectorizer) {
                (Some(vector), _, _) => {
                    let query: Vec<f32> = serde_json::from_str(&vector).map_err(|e| {
                        RagError::invalid_argument(format!("vector must be a JSON array: {}", e))
                    })?;
                    manager.similarity_search(&query, top_k, &columns).await?
                }
                (None, Some(text), Some(vectorizer)) => {
                    manager
                        .similarity_search_text(&text, &vectorizer, top_k, &columns)
                        .await?
                }
                _ => {
                    return Err(RagError::invalid_argument(
                        "pass --vector, or --text with --vectorizer",
                    ))
                }
            };

            info!(
                "Scanned {} rows, skipped {}, unvectorized {}",
                results.scanned, results.skipped, results.unvectorized
            );
            print_json(&results)?;
        }
        Commands::Backup { path } => {
            let count = manager.backup_database(&path).await?;
            println!("Backed up {} records to {}", count, path.display());
        }
        Commands::Restore { path } => {
            let count = manager.restore_database(&path, None).await?;
            println!("Restored {} records from {}", count, path.display());
        }
        Commands::Reset => {
            manager.reset_database().await?;
            println!("Reset table '{}'", manager.table().name);
        }
    }

    manager.close().await
}
