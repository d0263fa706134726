//! Command-line interface for cql-adapter
//!
//! # Usage Examples
//!
//! ```bash
//! # Table definition and validation schema of every table
//! cql-adapter convert --schema tables.yaml
//!
//! # CQL statements, qualified with a keyspace
//! cql-adapter ddl --schema tables.yaml --keyspace app
//!
//! # Dry-run sync with a configuration file
//! RUST_LOG=info cql-adapter sync --schema tables.yaml --config adapter.yaml
//! ```
//!
//! A schema file maps table names to declarative schemas:
//!
//! ```yaml
//! users:
//!   key: id
//!   properties:
//!     id: { type: string }
//!     tags: { type: array, properties: { tag: { type: string } } }
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use cql_adapter::{Adapter, AdapterConfig, MemoryStore};
use cql_types::{CqlDdl, SchemaConverter, ValidatorConverter};
use schema_core::SchemaSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cql-adapter")]
#[command(about = "Convert declarative table schemas into Cassandra tables and validation schemas")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print table definitions and validation schemas as JSON
    Convert {
        /// Schema file (YAML or JSON)
        #[arg(long, env = "CQL_ADAPTER_SCHEMA")]
        schema: PathBuf,

        /// Only convert this table
        #[arg(long)]
        table: Option<String>,
    },

    /// Print CQL statements for every table
    Ddl {
        /// Schema file (YAML or JSON)
        #[arg(long, env = "CQL_ADAPTER_SCHEMA")]
        schema: PathBuf,

        /// Keyspace to qualify table names with
        #[arg(long, env = "CQL_ADAPTER_KEYSPACE")]
        keyspace: Option<String>,
    },

    /// Sync every table against an in-memory store (dry run)
    Sync {
        /// Schema file (YAML or JSON)
        #[arg(long, env = "CQL_ADAPTER_SCHEMA")]
        schema: PathBuf,

        /// Adapter configuration file
        #[arg(long, env = "CQL_ADAPTER_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { schema, table } => run_convert(&schema, table.as_deref())?,
        Commands::Ddl { schema, keyspace } => run_ddl(&schema, keyspace)?,
        Commands::Sync { schema, config } => run_sync(&schema, config.as_deref()).await?,
    }

    Ok(())
}

fn load_schemas(path: &Path) -> anyhow::Result<SchemaSet> {
    SchemaSet::from_file(path).with_context(|| format!("Failed to load schema from {path:?}"))
}

fn run_convert(path: &Path, table: Option<&str>) -> anyhow::Result<()> {
    let schemas = load_schemas(path)?;
    let schema_converter = SchemaConverter::new();
    let validator_converter = ValidatorConverter::new();

    let names = match table {
        Some(name) => {
            schemas.table(name)?;
            vec![name]
        }
        None => schemas.table_names(),
    };

    let mut output = serde_json::Map::new();
    for name in names {
        let schema = schemas.table(name)?;
        output.insert(
            name.to_string(),
            serde_json::json!({
                "table": schema_converter.table_definition(schema).to_json(),
                "validation": validator_converter.validation_schema(schema).to_json(),
            }),
        );
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_ddl(path: &Path, keyspace: Option<String>) -> anyhow::Result<()> {
    let schemas = load_schemas(path)?;
    let adapter = Adapter::default();
    let ddl = match keyspace {
        Some(keyspace) => CqlDdl::with_keyspace(keyspace),
        None => CqlDdl::new(),
    };

    for (name, schema) in schemas.iter() {
        let table = adapter.prepare(name, schema);
        for statement in ddl.statements(name, table.definition()) {
            println!("{statement}");
        }
        println!();
    }

    Ok(())
}

async fn run_sync(path: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let schemas = load_schemas(path)?;
    let config = match config {
        Some(config) => AdapterConfig::from_file(config)?,
        None => AdapterConfig::default(),
    };

    tracing::info!(
        "Syncing {} tables to {} (port {})",
        schemas.len(),
        config.contact_points().join(","),
        config.port
    );
    if let Some(statement) = config.create_keyspace_statement() {
        tracing::info!("{}", statement);
    }

    let store = Arc::new(match &config.keyspace {
        Some(keyspace) => MemoryStore::with_keyspace(keyspace.clone()),
        None => MemoryStore::new(),
    });

    let mut adapter = Adapter::new(config);
    adapter.define_all(&schemas);
    adapter.sync(store.clone()).await?;

    for applied in store.applied() {
        tracing::info!(
            "Table {} applied with {} statements",
            applied.name,
            applied.statements.len()
        );
        for statement in &applied.statements {
            println!("{statement}");
        }
    }

    Ok(())
}
