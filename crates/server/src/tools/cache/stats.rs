//! cache_stats tool implementation.
//!
//! Lists every store in creation order with its entry count and payload size.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use swcache_client::{Worker, WorkerState};
use swcache_core::{CacheDb, StoreStats};

use crate::tools::json_result;

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub version: String,
    pub state: WorkerState,
    pub stores: Vec<StoreStats>,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(worker: &Worker, cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let stores = cache.store_stats().await?;
    let output = CacheStatsOutput {
        version: worker.config().version().to_string(),
        state: worker.state().await,
        stores,
    };

    json_result(&output)
}
