//! Structured errors raised by the host tools themselves.
//!
//! Engine errors arrive as `swcache_core::Error` and convert on their own.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the swcache host tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., unknown message type).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("bad".into()).into();
        assert_eq!(err.code.0, -32602);
        let err: McpError = ToolError::OutputFailed("bad".into()).into();
        assert_eq!(err.code.0, -32603);
    }
}
