//! # rods-harness CLI (`rods`)
//!
//! The `rods` binary is the primary interface for working with ELD
//! Hours-of-Service report PDFs: table extraction, table lookup, chunk
//! indexing and retrieval, LLM validation, and the MCP tool server.
//!
//! ## Usage
//!
//! ```bash
//! rods --config ./config/rods.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rods init` | Create the SQLite database and run schema migrations |
//! | `rods extract <pdf>` | Extract and group a report's tables to `<base>_tables.json` |
//! | `rods lookup <json> <table-id>` | Look up a table title across every log date |
//! | `rods index <pdf>` | Chunk and index a report's page text (+ embeddings) |
//! | `rods search "<query>"` | Retrieve indexed chunks |
//! | `rods validate "<query>"` | Validate a report segment against retrieved context |
//! | `rods serve mcp` | Start the MCP-compatible HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Extract the table structure of a report
//! rods extract US2__6028061125-121602771.pdf
//!
//! # Retrieve every day's header segment
//! rods lookup US2__6028061125-121602771_tables.json header
//!
//! # Index the report and search it
//! rods index US2__6028061125-121602771.pdf
//! rods search "Certification of RODS" --mode keyword
//!
//! # Ask the validator about a segment
//! rods validate "Login/Logout, Data Diagnostics and Malfunctions"
//!
//! # Start the MCP server for chat-client integration
//! rods serve mcp
//! ```

mod chunk;
mod config;
mod db;
mod embedding;
mod extract;
mod index;
mod llm;
mod lookup;
mod migrate;
mod models;
mod pdf;
mod search;
mod server;
mod tables;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rods-harness CLI — extract, index, retrieve, and validate ELD
/// Hours-of-Service compliance reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "rods",
    about = "rods-harness — PDF table extraction and retrieval for ELD Hours-of-Service reports",
    version,
    long_about = "rods-harness extracts the per-page tables of CCMTA/ELD Hours-of-Service report \
    PDFs into a date/title-keyed JSON document, indexes report text into a local SQLite chunk \
    index with optional embeddings, and exposes extraction, lookup, retrieval, and LLM \
    validation as tools over an MCP-compatible HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rods.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (reports,
    /// chunks, chunks_fts, embeddings). Idempotent — running it multiple
    /// times is safe.
    Init,

    /// Extract and group a report PDF's tables.
    ///
    /// Writes the nested date → title → row-group document as JSON to
    /// `<input-base-name>_tables.json` alongside the input.
    Extract {
        /// Path to the report PDF.
        pdf: PathBuf,
    },

    /// Look up a table title in an extracted `_tables.json` document.
    ///
    /// Prints every date's row groups stored under the given title key,
    /// in the order the dates appear in the document.
    Lookup {
        /// Path to a `_tables.json` file produced by `rods extract`.
        data_file: PathBuf,

        /// Normalized table title key (e.g. `header`, `comments_remarks`).
        table_id: String,

        /// Print the raw JSON instead of formatted rows.
        #[arg(long)]
        json: bool,
    },

    /// Chunk and index a report's page text.
    ///
    /// Replaces any previous chunks for the same report path and embeds
    /// them inline when an embedding provider is configured.
    Index {
        /// Path to the report PDF.
        pdf: PathBuf,
    },

    /// Retrieve indexed chunks for a query.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `keyword` (FTS5), `semantic` (vector), or `hybrid`.
        /// Semantic and hybrid require an embedding provider.
        #[arg(long, default_value = "keyword")]
        mode: String,

        /// Maximum number of chunks to return.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Validate a report segment against retrieved context.
    ///
    /// Requires an LLM provider to be configured.
    Validate {
        /// Query describing the segment to validate.
        query: String,

        /// Number of context chunks to retrieve.
        #[arg(long)]
        chunks: Option<i64>,
    },

    /// Start the MCP-compatible HTTP server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP tool server on the address configured in `[server].bind`.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Extract and lookup operate on files directly and don't need config.
    match &cli.command {
        Commands::Extract { pdf } => {
            extract::run_extract(pdf)?;
            return Ok(());
        }
        Commands::Lookup {
            data_file,
            table_id,
            json,
        } => {
            lookup::run_lookup(data_file, table_id, *json)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { pdf } => {
            index::run_index(&cfg, &pdf).await?;
        }
        Commands::Search { query, mode, limit } => {
            search::run_search(&cfg, &query, &mode, limit).await?;
        }
        Commands::Validate { query, chunks } => {
            validate::run_validate(&cfg, &query, chunks).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Extract { .. } | Commands::Lookup { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
