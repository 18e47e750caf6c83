//! swcache server entry point.
//!
//! Boots one offline caching worker and exposes its lifecycle over MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpNetwork, Worker};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        version = %config.version,
        namespace = %config.namespace,
        db_path = %config.db_path.display(),
        "Starting swcache server on stdio transport"
    );

    let cache = CacheDb::open(&config.db_path)
        .await
        .context("failed to open cache database")?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let worker = Worker::from_app(&config, cache.clone(), Arc::new(network))?;

    let handler = handler::SwCacheServer::new(Arc::new(worker), cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
