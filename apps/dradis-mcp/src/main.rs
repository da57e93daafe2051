//! # Dradis MCP Server
//!
//! Entry point for the MCP (Model Context Protocol) bridge to Dradis Pro.
//!
//! Configuration comes from environment variables (see `config`), with an
//! optional `.env` file in the working directory.
//!
//! ## Usage
//!
//! ```bash
//! # Serve MCP over stdio (default)
//! dradis-mcp
//! dradis-mcp serve
//!
//! # Check that the Dradis instance is reachable with the configured token
//! dradis-mcp check --project 1
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use dradis_core::{DradisError, ProjectId};
use dradis_mcp::{
    Config, DradisMcp, DradisSession,
    config::{USAGE, load_dotenv},
};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Dradis MCP Server - Model Context Protocol bridge to Dradis Pro
#[derive(Parser, Debug)]
#[command(name = "dradis-mcp")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log output format (overrides DRADIS_LOG_FORMAT)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP tools over stdio
    Serve,

    /// Verify connectivity and credentials against the Dradis instance
    Check {
        /// Project to fetch as the connectivity probe
        #[arg(short, long, default_value = "1")]
        project: ProjectId,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // .env may set RUST_LOG and DRADIS_LOG_FORMAT
    let dotenv = load_dotenv();
    init_tracing(cli.log_format);
    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Check { project } => {
            if check(config, project).await.is_err() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Logging goes to stderr only. Stdout carries the MCP stdio transport.
fn init_tracing(flag: Option<LogFormat>) {
    let format = resolve_log_format(flag, std::env::var("DRADIS_LOG_FORMAT").ok().as_deref());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dradis_mcp=info".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(false),
                )
                .init();
        }
    }
}

/// The command-line flag wins over `DRADIS_LOG_FORMAT`; anything but
/// `json` means text.
fn resolve_log_format(flag: Option<LogFormat>, env: Option<&str>) -> LogFormat {
    flag.unwrap_or(match env {
        Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    })
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        fields = ?config.fields.names(),
        "Dradis MCP server starting, target: {}",
        config.url
    );

    let session = Arc::new(DradisSession::new(config)?);
    let mcp = DradisMcp::new(session);

    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    tracing::info!("Dradis MCP server stopped");
    Ok(())
}

/// Fetch one project to prove the URL and token work.
async fn check(config: Config, project: ProjectId) -> Result<(), DradisError> {
    println!("Testing Dradis API connection to {}", config.url);
    let session = DradisSession::new(config)?;
    match session.client().project(project).await {
        Ok(details) => {
            println!("Connection successful!");
            println!("Test project: {} (ID: {})", details.name, details.id);
            Ok(())
        }
        Err(e) => {
            println!("Connection failed: {e}");
            Err(e)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
