//! CLI parse: clap types for graphgate. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::task::GraphForm;

/// GraphGate CLI - cached, retrying access to a graph-query endpoint
#[derive(Parser)]
#[command(name = "graphgate")]
#[command(about = "Query a graph endpoint through the graphgate cache and retry queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory or file (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a SELECT/ASK or update query
    Query {
        /// Query text
        query: String,
        /// Database (defaults to the configured default database)
        #[arg(long)]
        database: Option<String>,
        /// Reasoning for this query only: true, false or a level such as QL
        #[arg(long)]
        reasoning: Option<String>,
        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
        /// Print the raw JSON response instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run a CONSTRUCT/DESCRIBE query and print the JSON-LD document
    Graph {
        /// Query text
        query: String,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        reasoning: Option<String>,
        /// Document form: raw, compact, flatten, expand
        #[arg(long, default_value = "raw")]
        form: GraphForm,
        #[arg(long)]
        no_cache: bool,
    },
    /// Insert an N-Triples / N-Quads file
    Insert {
        /// File holding the triples
        file: PathBuf,
        /// Named graph to insert into
        #[arg(long)]
        graph: Option<String>,
        #[arg(long)]
        database: Option<String>,
    },
    /// Print the effective configuration
    Config,
}
