use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::{Map, Value};

use pgcypher::config::TranslatorConfig;
use pgcypher::cypher::RegularQuery;
use pgcypher::translate::{self, InMemoryKindMapper};

/// pgcypher - translates cypher syntax trees into PostgreSQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Cypher AST as JSON or YAML, `-` for stdin
    #[arg(long, short, default_value = "-")]
    input: String,

    /// YAML map of kind names to kind ids
    #[arg(long)]
    kinds: Option<PathBuf>,

    /// JSON object of cypher parameter values
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Translator configuration YAML; environment variables are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Depth ceiling for unbounded variable length patterns
    #[arg(long)]
    max_depth: Option<u32>,

    /// Inline parameter values into the rendered SQL
    #[arg(long)]
    materialize: bool,
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read cypher AST from stdin")?;
        return Ok(content);
    }

    std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))
}

/// JSON is tried first; YAML is a superset of it and reports better errors for YAML input
fn parse_query(content: &str) -> Result<RegularQuery> {
    match serde_json::from_str(content) {
        Ok(query) => Ok(query),
        Err(_) => serde_yaml::from_str(content).context("failed to parse cypher AST"),
    }
}

fn load_kinds(path: Option<&Path>) -> Result<InMemoryKindMapper> {
    let Some(path) = path else {
        return Ok(InMemoryKindMapper::new());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read kinds from {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse kinds from {}", path.display()))
}

fn load_parameters(path: Option<&Path>) -> Result<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read parameters from {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse parameters from {}", path.display()))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TranslatorConfig::from_yaml_file(path)?,
        None => TranslatorConfig::from_env()?,
    }
    .with_max_traversal_depth(cli.max_depth)?;

    let query = parse_query(&read_input(&cli.input)?)?;
    let kinds = load_kinds(cli.kinds.as_deref())?;
    let parameters = load_parameters(cli.parameters.as_deref())?;

    info!("translating with {} known kind(s)", kinds.len());

    let translation = translate::translate(&query, &kinds, &parameters, &config)?;
    let sql = translation.to_sql(cli.materialize || config.materialize_parameters)?;

    println!("{sql}");
    println!("{}", serde_json::to_string_pretty(&translation.parameters)?);

    Ok(())
}
