use std::time::Duration;

use crate::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named, self-validating operation invoked by the data worker.
///
/// Tools report domain failures (unknown customer, bad enum value) inside the
/// returned payload as `{"success": false, "error": ...}` and reserve `Err`
/// for faults in the tool itself.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}
