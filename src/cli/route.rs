//! CLI route: run context and the command table.

use std::path::{Path, PathBuf};

use crate::cli::output::render_results_table;
use crate::cli::parse::Commands;
use crate::codec::GraphInput;
use crate::config::{ConfigLoader, GraphGateConfig};
use crate::connection::Connection;
use crate::error::QueryError;
use crate::results::SparqlResults;
use crate::task::{QueryOptions, ReasoningMode};

/// Runtime context for CLI execution: loaded configuration and a connection.
pub struct RunContext {
    config: GraphGateConfig,
    connection: Connection,
}

impl RunContext {
    /// `config_path` may name a directory holding `graphgate.toml` or a file.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, QueryError> {
        let config = load_config(config_path.as_deref())?;
        let connection = Connection::from_config(&config)?;
        Ok(Self { config, connection })
    }

    pub fn config(&self) -> &GraphGateConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, QueryError> {
        match command {
            Commands::Query {
                query,
                database,
                reasoning,
                no_cache,
                json,
            } => {
                let options = build_options(query, database, reasoning, *no_cache);
                let body = self.connection.query(options).await?;
                if *json {
                    return to_pretty(&body);
                }
                match SparqlResults::from_value(body.clone()) {
                    Ok(results) => Ok(render_results_table(&results)),
                    // Update responses carry no result table.
                    Err(_) => to_pretty(&body),
                }
            }
            Commands::Graph {
                query,
                database,
                reasoning,
                form,
                no_cache,
            } => {
                let options =
                    build_options(query, database, reasoning, *no_cache).with_form(*form);
                let document = self.connection.get_graph(options).await?;
                to_pretty(&document)
            }
            Commands::Insert {
                file,
                graph,
                database,
            } => {
                if let Some(database) = database {
                    self.connection.set_default_database(Some(database.clone()));
                }
                let input = read_graph_file(file)?;
                self.connection.insert_graph(input, graph.as_deref()).await?;
                Ok(format!("Inserted {}", file.display()))
            }
            Commands::Config => self.config.redacted().to_toml(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GraphGateConfig, QueryError> {
    let config = match path {
        Some(path) if path.is_file() => ConfigLoader::from_file(path)?,
        Some(dir) => ConfigLoader::load(Some(dir))?,
        None => ConfigLoader::load(None)?,
    };
    Ok(config)
}

fn build_options(
    query: &str,
    database: &Option<String>,
    reasoning: &Option<String>,
    no_cache: bool,
) -> QueryOptions {
    let mut options = QueryOptions::new(query);
    options.database = database.clone();
    options.reasoning = reasoning.as_deref().map(ReasoningMode::from);
    if no_cache {
        options.cache = Some(false);
    }
    options
}

/// `.jsonld`/`.json` files are JSON-LD documents; anything else is N-Quads text.
fn read_graph_file(path: &Path) -> Result<GraphInput, QueryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| QueryError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    let is_json = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jsonld") | Some("json")
    );
    if is_json {
        let document =
            serde_json::from_str(&text).map_err(|e| QueryError::Decode(e.to_string()))?;
        Ok(GraphInput::JsonLd(document))
    } else {
        Ok(GraphInput::NQuads(text))
    }
}

fn to_pretty(value: &serde_json::Value) -> Result<String, QueryError> {
    serde_json::to_string_pretty(value).map_err(|e| QueryError::Decode(e.to_string()))
}
