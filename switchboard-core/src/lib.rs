mod context;
mod decision;
mod error;
mod llm;
mod timeout;
mod tool;
mod value;

pub use context::{
    DataResult, NextAction, SupportContext, DATA_QUERY_RESULT_KEY, SUPPORT_REQUEST_KEY,
};
pub use decision::{ResponseDrafter, RouteDecider, SelectionRequest, ToolSelection, ToolSelector};
pub use error::SwitchboardError;
pub use llm::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolSpec};
pub use timeout::with_timeout;
pub use tool::{Tool, ToolError};
pub use value::{value_preview, Value};
