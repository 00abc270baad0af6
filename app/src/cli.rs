//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default interchange file for export and seed.
pub const DEFAULT_DATASET: &str = "dataset/jobs.jsonl";

#[derive(Parser, Debug)]
#[command(
    name = "jobtap",
    version,
    about = "Scrape job listings through a real browser and push them to the store"
)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true, env = "JOBTAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one search and print the first page of results.
    Query {
        /// Search text.
        query: String,

        /// Write the result to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Scrape listings until results converge and push them to the store.
    Sync {
        /// Comma-separated queries; browse everything when omitted.
        #[arg(long)]
        queries: Option<String>,

        /// Also write the normalized listings to this file.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Export every stored listing to a JSON-lines file.
    Export {
        #[arg(long, short, default_value = DEFAULT_DATASET)]
        output: PathBuf,
    },

    /// Load a JSON-lines file into the store.
    Seed {
        #[arg(long, short, default_value = DEFAULT_DATASET)]
        input: PathBuf,
    },

    /// Run the HTTP search API.
    Serve,
}
