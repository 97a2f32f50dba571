//! Decision functions backed by a [`ToolCallingLlm`].

use std::sync::Arc;

use switchboard_core::{
    LlmRequest, Message, ResponseDrafter, RouteDecider, SelectionRequest, SupportContext,
    SwitchboardError, ToolCallingLlm, ToolSelection, ToolSelector,
};

pub const ROUTER_PROMPT: &str = "You are the router of a customer service system. \
Read the query and the context and answer with exactly one of DATA_AGENT, SUPPORT_AGENT, \
ESCALATE or COMPLETE. Pick DATA_AGENT when customer records or tickets must be read or \
changed and the context does not hold them yet.";

pub const SELECTOR_PROMPT: &str = "You are the customer data agent. Call exactly one of \
the available tools to fetch or change the data the query needs. Never invent customer data.";

pub const DRAFTER_PROMPT: &str = "You are the support agent. Answer the customer using the \
data in the context. If you need customer data that the context does not hold, reply with \
a single line `ROUTING_REQUEST: <what you need>` and nothing else.";

fn user_turn(query: &str, context: &SupportContext) -> Message {
    Message::user(format!("Query: {query}\nContext: {}", context.prompt_view()))
}

fn request(model: &str, system: &str, user: Message) -> LlmRequest {
    LlmRequest {
        model: model.to_string(),
        messages: vec![Message::system(system), user],
        tools: Vec::new(),
    }
}

pub struct LlmRouteDecider {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    prompt: String,
}

impl LlmRouteDecider {
    pub fn new(llm: Arc<dyn ToolCallingLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt: ROUTER_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait::async_trait]
impl RouteDecider for LlmRouteDecider {
    async fn decide(
        &self,
        query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        let response = self
            .llm
            .invoke(request(&self.model, &self.prompt, user_turn(query, context)))
            .await?;
        Ok(response.content)
    }
}

/// Uses the model's first tool call as the selection.
pub struct LlmToolSelector {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    prompt: String,
}

impl LlmToolSelector {
    pub fn new(llm: Arc<dyn ToolCallingLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt: SELECTOR_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait::async_trait]
impl ToolSelector for LlmToolSelector {
    async fn select(
        &self,
        selection: SelectionRequest<'_>,
    ) -> Result<Option<ToolSelection>, SwitchboardError> {
        let user = Message::user(format!(
            "User query: {}\nSupport request (if any): {}\nExisting context: {}",
            selection.query,
            selection.support_request.unwrap_or_default(),
            selection.context.prompt_view()
        ));
        let mut llm_request = request(&self.model, &self.prompt, user);
        llm_request.tools = selection.tools.to_vec();

        let response = self.llm.invoke(llm_request).await?;
        Ok(response
            .tool_calls
            .into_iter()
            .next()
            .map(|call| ToolSelection::new(call.name, call.args)))
    }
}

pub struct LlmResponseDrafter {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    prompt: String,
}

impl LlmResponseDrafter {
    pub fn new(llm: Arc<dyn ToolCallingLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt: DRAFTER_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait::async_trait]
impl ResponseDrafter for LlmResponseDrafter {
    async fn draft(
        &self,
        query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        let response = self
            .llm
            .invoke(request(&self.model, &self.prompt, user_turn(query, context)))
            .await?;
        Ok(response.content)
    }
}
