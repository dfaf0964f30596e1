//! gmail-mcp - MCP agent for Gmail, Calendar and Classroom.
//!
//! This is the main entry point for the gmail-mcp CLI.

mod commands;

use clap::{Parser, Subcommand};
use gmail_mcp_core::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gmail-mcp")]
#[command(
    author,
    version,
    about = "MCP agent for Gmail, Calendar and Classroom",
    long_about = None
)]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP HTTP server
    Serve {
        /// Address to bind to
        #[arg(short, long)]
        address: Option<SocketAddr>,

        /// Base URL of the Google backend
        #[arg(long)]
        backend_url: Option<String>,
    },
    /// Print the tool definitions as JSON
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().ok();
    let (mut config, sources) = Config::load(cli.config.as_deref(), cwd.as_deref()).await?;

    match cli.command {
        Commands::Serve {
            address,
            backend_url,
        } => {
            commands::init_logging(cli.verbose);
            for source in &sources {
                info!(path = %source.display(), "Loaded configuration");
            }

            if let Some(address) = address {
                config.server.address = address;
            }
            if let Some(backend_url) = backend_url {
                config.backend_url = backend_url;
                config.normalize();
                config.validate()?;
            }

            commands::serve(config).await
        }
        Commands::Tools => commands::print_tools(&config),
    }
}
