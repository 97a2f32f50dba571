use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{with_timeout, ResponseDrafter, SupportContext, SwitchboardError};

pub const ROUTING_REQUEST_PREFIX: &str = "ROUTING_REQUEST:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseResult {
    Final(String),
    /// The drafter asked for more data; the code may be empty.
    NeedData(String),
}

/// Splits drafter output into a final answer or a data request.
///
/// The request code is whatever follows the prefix on the same line.
pub fn parse_response(raw: &str) -> ResponseResult {
    let text = raw.trim();
    match text.strip_prefix(ROUTING_REQUEST_PREFIX) {
        Some(rest) => {
            let code = rest.lines().next().unwrap_or_default().trim();
            ResponseResult::NeedData(code.to_string())
        }
        None => ResponseResult::Final(text.to_string()),
    }
}

pub struct ResponseWorker {
    drafter: Arc<dyn ResponseDrafter>,
}

impl ResponseWorker {
    pub fn new(drafter: Arc<dyn ResponseDrafter>) -> Self {
        Self { drafter }
    }

    pub async fn act(
        &self,
        query: &str,
        context: &SupportContext,
        call_timeout: Duration,
    ) -> Result<ResponseResult, SwitchboardError> {
        let raw = with_timeout(call_timeout, self.drafter.draft(query, context)).await?;
        Ok(parse_response(&raw))
    }
}
