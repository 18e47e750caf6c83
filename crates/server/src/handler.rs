//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker's lifecycle triggers.
use crate::tools::{
    SwFetchParams, SwMessageParams, activate_impl, fetch_impl, install_impl, message_impl, stats_impl,
};

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::Worker;
use swcache_core::CacheDb;

/// The MCP server handler hosting one worker.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<Worker>,
    cache: CacheDb,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a worker and its database.
    pub fn new(worker: Arc<Worker>, cache: CacheDb) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    /// Precache the manifest into this version's static store.
    #[tool(description = "Install the worker: precache the asset manifest into the versioned static store.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    /// Purge stores of older versions and claim open pages.
    #[tool(description = "Activate the worker: delete caches of older versions in the namespace and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route one request through the caching strategies.
    #[tool(
        description = "Intercept a request. Images and static assets are cache-first, pages are network-first, API calls and non-GET requests pass through."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Deliver a control message from a page.
    #[tool(description = "Send a control message: SKIP_WAITING or CLEAR_CACHE.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    /// Report every store with its entry count and size.
    #[tool(description = "Get cache statistics: worker state, version and per-store entry counts.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.worker, &self.cache).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline caching worker. Call sw_install then sw_activate, then route requests through sw_fetch."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::worker;

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let (worker, _, db) = worker("casa-v1", &[]).await;
        let server = SwCacheServer::new(worker, db);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["cache_stats", "sw_activate", "sw_fetch", "sw_install", "sw_message"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _, db) = worker("casa-v1", &[]).await;
        let info = SwCacheServer::new(worker, db).get_info();
        assert_eq!(info.server_info.name, "swcache");
    }
}
