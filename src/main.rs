mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dscvr::config::DscvrConfig;

#[derive(Parser)]
#[command(name = "dscvr", version, about = "Content-based music recommendations")]
struct Cli {
    /// Config file (defaults to ~/.dscvr/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit features on the corpus and publish artifacts
    Build {
        /// Corpus file (JSON array or JSON lines)
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Output dimensionality
        #[arg(long)]
        components: Option<usize>,
    },
    /// Fuzzy-search tracks by title and artist
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Recommend tracks similar to the best match for a query
    Recommend {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        max_per_artist: Option<usize>,
    },
    /// Check the published artifacts
    Doctor,
    /// Start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DscvrConfig::load_from(path)?,
        None => DscvrConfig::load()?,
    };

    // Log to stderr so stdout carries only command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build { corpus, components } => {
            cli::build::build(&config, corpus, components).await?;
        }
        Command::Search { query, limit } => {
            cli::search::search(&config, &query, limit).await?;
        }
        Command::Recommend {
            query,
            top_k,
            max_per_artist,
        } => {
            cli::search::recommend(&config, &query, top_k, max_per_artist).await?;
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Serve => dscvr::server::serve(config).await?,
    }

    Ok(())
}
