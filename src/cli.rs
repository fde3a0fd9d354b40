//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CB Insights chat proxy - token-caching API forwarder with trend extraction
#[derive(Parser, Debug)]
#[command(name = "cbi-proxy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CBI_PROXY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CBI_PROXY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "CBI_PROXY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CBI_PROXY_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CBI_PROXY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the proxy server (default)
    Serve,

    /// Fetch trends once and write the static snapshot file
    Fetch {
        /// Question sent upstream (defaults to the configured trends query)
        #[arg(short, long)]
        query: Option<String>,

        /// Output path for the snapshot JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of trends kept in the snapshot
        #[arg(long)]
        max_trends: Option<usize>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to forward
        #[arg(required = true)]
        question: String,

        /// Print the normalized response as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
