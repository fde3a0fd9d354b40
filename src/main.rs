//! CBI Proxy - CB Insights chat proxy
//!
//! Three front doors over one chat forwarder: an HTTP server, a one-shot
//! trends snapshot fetch, and a one-shot question on stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use cbi_proxy::{
    cli::{Cli, Command},
    config::Config,
    fetch,
    forwarder::ChatForwarder,
    server::ProxyServer,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Fetch {
            query,
            output,
            max_trends,
        }) => run_fetch(&config, query, output, max_trends).await,
        Some(Command::Ask { question, json }) => run_ask(&config, &question, json).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Run the proxy server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "Starting CBI proxy"
    );

    if let Err(e) = ProxyServer::new(config).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Proxy shutdown complete");
    ExitCode::SUCCESS
}

/// Fetch trends once and write the snapshot file
async fn run_fetch(
    config: &Config,
    query: Option<String>,
    output: Option<PathBuf>,
    max_trends: Option<usize>,
) -> ExitCode {
    let forwarder = ChatForwarder::from_config(config);
    if !forwarder.has_credentials() {
        error!("Missing CB Insights credentials - set CBI_CLIENT_ID and CBI_CLIENT_SECRET");
        return ExitCode::FAILURE;
    }

    let query = query.unwrap_or_else(|| config.trends_query());
    let max_trends = max_trends.or(config.trends.max_trends);
    let output = output.unwrap_or_else(|| config.trends.output.clone());

    let snapshot = match fetch::fetch_trends(&forwarder, &query, max_trends).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to fetch trends: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fetch::write_snapshot(&snapshot, &output) {
        error!("Failed to write snapshot: {e}");
        return ExitCode::FAILURE;
    }

    println!("Saved {} trends to {}", snapshot.trends.len(), output.display());
    for trend in &snapshot.trends {
        println!("  {}. {}", trend.priority, trend.name);
    }
    ExitCode::SUCCESS
}

/// Ask a single question and print the answer
async fn run_ask(config: &Config, question: &str, as_json: bool) -> ExitCode {
    let forwarder = ChatForwarder::from_config(config);

    let answer = match forwarder.forward(question).await {
        Ok(a) => a,
        Err(e) => {
            error!("Request failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if as_json {
        match serde_json::to_string_pretty(&answer) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialize answer: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", answer.message);
        if !answer.sources.is_empty() {
            println!("\nSources:");
            for source in &answer.sources {
                println!("  - {} ({})", source.title, source.url);
            }
        }
    }
    ExitCode::SUCCESS
}
