//! CLI module for cvrag
//!
//! Command-line parsing for the `cvrag` binary. Uses clap for argument
//! parsing and owo-colors for colored terminal output.

pub mod output;

use crate::utils::config::MAX_TOP_K;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG: &str = "cvrag.toml";

/// cvrag - ask questions about a CV
///
/// Answers questions grounded in fragments retrieved from a prebuilt
/// vector index, using a local or hosted language model.
#[derive(Parser, Debug)]
#[command(
    name = "cvrag",
    version,
    about = "Grounded question answering over a CV",
    long_about = "Retrieves the most relevant fragments of a prebuilt index and asks a language\n\
                  model to answer from them only, citing its sources.\n\n\
                  The backend is picked from the environment: OLLAMA_MODEL selects a local\n\
                  Ollama model, otherwise ANTHROPIC_API_KEY selects Claude, otherwise OpenAI.",
    after_help = "EXAMPLES:\n    \
                  cvrag ask \"How many years of experience?\"\n    \
                  cvrag ask --json --top-k 4 \"Where did they study?\"\n    \
                  cvrag check                      # Verify index, model cache and backend\n    \
                  cvrag serve --port 8080          # Start the HTTP API"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the answer and contexts as JSON
        #[arg(long)]
        json: bool,

        /// Number of fragments to retrieve (overrides TOP_K)
        #[arg(short = 'k', long, value_parser = parse_top_k)]
        top_k: Option<usize>,
    },

    /// Check that the index, embedding model and backend are ready
    Check,

    /// Start the HTTP API
    Serve {
        /// Host address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The configuration path and whether the user asked for it explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG), false),
        }
    }
}

fn parse_top_k(raw: &str) -> Result<usize, String> {
    let k: usize = raw.parse().map_err(|e| format!("{}", e))?;
    if k == 0 || k > MAX_TOP_K {
        return Err(format!("must be between 1 and {}", MAX_TOP_K));
    }
    Ok(k)
}
