//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache host. Each tool
//! forwards to one lifecycle trigger of the worker.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

pub use cache::{CacheStatsOutput, stats_impl};
pub use fetch::{SwFetchOutput, SwFetchParams, fetch_impl};
pub use lifecycle::{SwMessageParams, activate_impl, install_impl, message_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
