//! Capability interfaces for the three opaque decision functions.
//!
//! Implementations are best-effort and may return anything; the graph owns
//! all parsing, validation and fallback behaviour.

use serde::{Deserialize, Serialize};

use crate::{SupportContext, SwitchboardError, ToolSpec, Value};

/// Soft routing decision: raw text expected to name the next action.
#[async_trait::async_trait]
pub trait RouteDecider: Send + Sync {
    async fn decide(&self, query: &str, context: &SupportContext)
        -> Result<String, SwitchboardError>;
}

/// Picks one registered tool and its arguments, or nothing.
#[async_trait::async_trait]
pub trait ToolSelector: Send + Sync {
    async fn select(
        &self,
        request: SelectionRequest<'_>,
    ) -> Result<Option<ToolSelection>, SwitchboardError>;
}

/// Produces either a final answer or `ROUTING_REQUEST: <code>`.
#[async_trait::async_trait]
pub trait ResponseDrafter: Send + Sync {
    async fn draft(&self, query: &str, context: &SupportContext)
        -> Result<String, SwitchboardError>;
}

#[derive(Clone, Copy, Debug)]
pub struct SelectionRequest<'a> {
    pub query: &'a str,
    pub support_request: Option<&'a str>,
    pub context: &'a SupportContext,
    pub tools: &'a [ToolSpec],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolSelection {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Returns the named argument if the arguments are a JSON object holding it.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.as_object().and_then(|args| args.get(key))
    }
}
