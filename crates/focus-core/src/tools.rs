//! The tool trait exposed to agents through the protocol adapter. Each tool
//! declares a stable name, a description used for tool selection, and a JSON
//! schema for its arguments; execution receives the resolved principal so
//! mutations are attributed to the right actor.

use async_trait::async_trait;
use serde::Serialize;

use crate::actor::AuthenticatedPrincipal;

/// Execution context passed to every tool call.
pub struct ToolContext {
    pub principal: AuthenticatedPrincipal,
}

/// Tool definition advertised to agents via `tools/list`.
#[derive(Clone, Debug, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Stable kind string carried in the `error` field of a failure
    /// envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::NotFound(_) => "not_found",
            Self::ExecutionFailed(_) => "execution_failed",
        }
    }

    /// The detail message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidArguments(m) | Self::NotFound(m) | Self::ExecutionFailed(m) => m,
        }
    }
}

/// Trait implemented by each agent-facing tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool. Returns the raw success payload; the dispatch adapter
    /// wraps it in the `{success, data}` envelope and a content block.
    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
