// Port for the external tool-aggregation service.
//
// The core only knows it can list tools, execute one on behalf of a user, and
// list the user's connected accounts. The HTTP client lives in infra/composio.

use super::tool_models::{ConnectedAccount, ToolDefinition, ToolExecution, ToolQuery};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Tool service request failed: {0}")]
    Transport(String),

    #[error("Unexpected tool service response: {0}")]
    InvalidResponse(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Heuristic for "the user still needs to connect an account".
    pub fn is_auth_failure(&self) -> bool {
        if matches!(self.status(), Some(401) | Some(403)) {
            return true;
        }
        let message = self.to_string().to_lowercase();
        message.contains("not connected")
            || message.contains("authentication")
            || message.contains("unauthorized")
    }

    pub fn mentions_no_connected_accounts(&self) -> bool {
        self.to_string().contains("No connected accounts")
    }
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Fetches tool definitions usable by `user_id`.
    async fn get_tools(
        &self,
        user_id: &str,
        query: &ToolQuery,
    ) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Executes a hosted tool for `user_id`.
    async fn execute_tool(
        &self,
        user_id: &str,
        slug: &str,
        arguments: &Value,
    ) -> Result<ToolExecution, ToolError>;

    /// Lists connected accounts, filtered by users and (optionally) toolkits.
    async fn list_connected_accounts(
        &self,
        user_ids: &[String],
        toolkit_slugs: &[String],
    ) -> Result<Vec<ConnectedAccount>, ToolError>;
}
