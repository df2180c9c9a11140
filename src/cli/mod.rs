//! CLI module for DocQA
//!
//! Provides command-line interface parsing for the docqa-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DocQA - Retrieval-augmented documentation Q&A
#[derive(Parser, Debug)]
#[command(
    name = "docqa-server",
    version,
    about = "DocQA - Retrieval-augmented documentation Q&A",
    long_about = "Answers questions about a documentation set from a local vector index,\n\
                  using a remote gateway for embeddings and completions.\n\n\
                  Run without arguments to start the server, or use 'ingest' to build the index.",
    after_help = "EXAMPLES:\n    \
                  docqa-server ingest                     # Build the index from configured URLs\n    \
                  docqa-server ask \"What is tracing?\"     # Answer one question\n    \
                  docqa-server ask --stream \"...\"         # Print each stage as it completes\n    \
                  docqa-server                            # Start the server (docqa.toml optional)\n    \
                  docqa-server --config my.toml           # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "docqa.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve the HTTP API (default)
    ///
    /// Loads the persisted index if there is one; without it the server
    /// still starts and reports itself as degraded.
    Serve,

    /// Fetch, chunk, embed, and persist the documentation index
    Ingest {
        /// Source URL to ingest instead of the configured list (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,
    },

    /// Answer a single question from the persisted index
    Ask {
        /// The question to answer
        question: String,

        /// Print each stage's output as it completes
        #[arg(long)]
        stream: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and exit
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
