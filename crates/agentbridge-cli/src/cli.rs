//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// agentbridge -- SaaS adapters exposed as MCP tools.
#[derive(Debug, Parser)]
#[command(
    name = "agentbridge",
    version,
    about = "agentbridge -- SaaS adapters exposed as MCP tools",
    long_about = "Serves Shopify, Google Workspace and call-relay tools over the Model \
                  Context Protocol.  Caller credentials arrive as request headers."
)]
pub struct Cli {
    /// Emit logs as JSON lines instead of the compact format.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the MCP server.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, short, default_value_t = 8787)]
        port: u16,
    },

    /// Print every registered tool with its input schema.
    Tools {
        /// Print the full `tools/list` JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["agentbridge", "serve"]);
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, "127.0.0.1");
                assert_eq!(port, 8787);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.json_logs);
    }

    #[test]
    fn serve_overrides() {
        let cli = Cli::parse_from(["agentbridge", "--json-logs", "serve", "--bind", "0.0.0.0", "-p", "9000"]);
        assert!(cli.json_logs);
        assert!(matches!(
            cli.command,
            Commands::Serve { ref bind, port: 9000 } if bind == "0.0.0.0"
        ));
    }

    #[test]
    fn tools_json_flag() {
        let cli = Cli::parse_from(["agentbridge", "tools", "--json"]);
        assert!(matches!(cli.command, Commands::Tools { json: true }));
    }
}
