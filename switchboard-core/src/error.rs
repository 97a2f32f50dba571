use std::time::Duration;

use thiserror::Error;

use crate::ToolError;

#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Custom(String),
}

impl From<ToolError> for SwitchboardError {
    fn from(err: ToolError) -> Self {
        SwitchboardError::Custom(err.to_string())
    }
}
