//! badge CLI tool
//!
//! Command-line diagnostics for badge graph configurations.
//!
//! ## Commands
//!
//! - `check <config>`: Build the graph and report cycles and dangling relations
//! - `dump <config>`: Print the relations, values and groups of the configured graph

use badge_graph::{
    config::{GraphConfigProvider, TomlConfigProvider},
    BadgeGraph,
};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "badge")]
#[command(author, version, about = "Inspect badge graph configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a graph configuration
    Check {
        /// Path to the TOML graph configuration
        config: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the graph described by a configuration
    Dump {
        /// Path to the TOML graph configuration
        config: PathBuf,

        /// Emit a JSON snapshot instead of the text listing
        #[arg(long)]
        json: bool,
    },
}

fn load(path: PathBuf) -> Result<BadgeGraph, Box<dyn std::error::Error>> {
    let provider = TomlConfigProvider::new(path);
    if !provider.path().exists() {
        return Err(format!("config file not found: {}", provider.path().display()).into());
    }
    Ok(BadgeGraph::from_config(&provider.get_config()?)?)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config, verbose } => {
            let graph = load(config)?;
            let diagnostics = graph.validate();
            if verbose {
                println!(
                    "{} badges, {} relations",
                    graph.len(),
                    graph.edges().edge_count()
                );
            }
            for diagnostic in diagnostics.iter() {
                let level = if diagnostic.is_error() { "error" } else { "warning" };
                println!("{level}: {diagnostic}");
            }
            if diagnostics.iter().any(|d| d.is_error()) {
                return Ok(ExitCode::FAILURE);
            }
            if diagnostics.is_empty() {
                println!("ok");
            }
        }
        Commands::Dump { config, json } => {
            let graph = load(config)?;
            if json {
                println!("{}", graph.snapshot().to_json()?);
            } else {
                print!("{}", graph.dump_graph());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
