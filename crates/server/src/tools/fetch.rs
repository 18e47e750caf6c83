//! sw_fetch tool implementation.
//!
//! Runs one request through the worker's fetch handler: classify, pick the
//! strategy, and report what the page would receive.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::{canonicalize, content_type};
use swcache_client::{FetchOutcome, LifecycleHandler, Worker};
use swcache_core::{Destination, Request, ResourceClass};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute http(s) URL of the request.
    pub url: String,

    /// HTTP method (default: "GET").
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination hint: "document", "image", "style", "script", "font" or empty.
    #[serde(default)]
    pub destination: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub class: ResourceClass,
    /// False when the request passed through untouched.
    pub handled: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy.
    pub body: Option<String>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method must not be empty".into()).into());
    }

    let request = Request::new(&params.method, url, Destination::parse(&params.destination));
    let class = worker.classify(&request);
    let url = request.url().to_string();

    let output = match worker.on_fetch(request).await {
        FetchOutcome::Respond(response) => {
            let status = response.status();
            let content_type = content_type(&response).map(str::to_string);
            let headers = response.headers().to_vec();
            let body = response.into_body()?;
            SwFetchOutput {
                url,
                class,
                handled: true,
                status: Some(status),
                content_type,
                headers,
                body: Some(String::from_utf8_lossy(&body).into_owned()),
            }
        }
        FetchOutcome::Passthrough => SwFetchOutput {
            url,
            class,
            handled: false,
            status: None,
            content_type: None,
            headers: Vec::new(),
            body: None,
        },
    };

    json_result(&output)
}
