//! agentbridge CLI entry point.

mod adapters;
mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use agentbridge_web::{McpServer, WebConfig, WebServer};

use crate::cli::{Cli, Commands};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("info", cli.json_logs);

    let config = Config::load().context("invalid configuration")?;

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(config, bind, port).await,
        Commands::Tools { json } => cmd_tools(config, json).await,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_serve(config: Config, bind: String, port: u16) -> Result<()> {
    let mut adapters = adapters::init_adapters(&config).await?;
    tracing::info!(adapters = adapters.len(), "adapters connected");

    let server = WebServer::new(WebConfig { bind_addr: bind, port }, adapters.clone());
    let result = server.run(shutdown_signal()).await;

    adapters::shutdown_adapters(&mut adapters).await;
    result.context("MCP server failed")
}

async fn cmd_tools(config: Config, as_json: bool) -> Result<()> {
    let adapters = adapters::init_adapters(&config).await?;
    let tools = McpServer::new(adapters).list_tools();

    if as_json {
        let listing = serde_json::to_string_pretty(&json!({ "tools": tools }))?;
        println!("{listing}");
        return Ok(());
    }

    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in &tools {
        println!("  {:<width$}  {}", tool.name, tool.description);
    }
    println!();
    println!("  {} tools", tools.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides `default_level`.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
