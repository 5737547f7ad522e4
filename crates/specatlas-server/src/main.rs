//! SpecAtlas MCP server: stdio transport, stderr logging.

mod bootstrap;
mod prompts;
mod resources;
mod tools;

use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use specatlas_registry::registry::SpecRegistry;
use std::sync::Arc;
use tools::AtlasService;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "specatlas-server", version, about = "MCP server for OpenAPI spec discovery")]
struct Cli {
    /// Bootstrap sources: an inline JSON array of {id, location} entries, or the path
    /// of a JSON file containing one. Defaults to ./openapi-sources.json when present.
    #[arg(long, env = "SPECATLAS_SOURCES")]
    sources: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries the MCP protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(SpecRegistry::new());

    let sources = bootstrap::load_sources(cli.sources.as_deref())?;
    bootstrap::apply(&registry, &sources).await;

    tracing::info!(specs = registry.list().len(), "Serving SpecAtlas over stdio");
    let service = AtlasService::new(registry).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
