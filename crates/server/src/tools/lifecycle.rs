//! sw_install, sw_activate and sw_message tool implementations.
//!
//! Each tool fires one lifecycle trigger and returns once its work settled.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ControlMessage, InstallReport, LifecycleHandler, MessageOutcome, PurgeReport, Worker, WorkerState};

use super::json_result;
use crate::error::ToolError;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwInstallOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: InstallReport,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwActivateOutput {
    pub state: WorkerState,
    pub clients_claimed: bool,
    #[serde(flatten)]
    pub purged: PurgeReport,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: "SKIP_WAITING" or "CLEAR_CACHE".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwMessageOutput {
    pub skip_waiting: bool,
    #[serde(flatten)]
    pub outcome: MessageOutcome,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    json_result(&SwInstallOutput { state: worker.state().await, report })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let purged = worker.on_activate().await?;
    json_result(&SwActivateOutput { state: worker.state().await, clients_claimed: worker.clients_claimed(), purged })
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message: ControlMessage = serde_json::from_value(serde_json::json!({ "type": params.kind }))
        .map_err(|_| ToolError::InvalidInput(format!("unknown message type: {}", params.kind)))?;

    let outcome = worker.on_message(message).await;
    json_result(&SwMessageOutput { skip_waiting: worker.skip_waiting_requested(), outcome })
}
