use serde::{Deserialize, Serialize};
use switchboard_core::{DataResult, NextAction, SupportContext, Value};
use uuid::Uuid;

/// The single record threaded through every step of a run.
///
/// All writes go through methods: the trail only grows, the final response
/// is set at most once, and the context reserved keys keep their owners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    run_id: Uuid,
    query: String,
    next_action: NextAction,
    context: SupportContext,
    trail: Vec<String>,
    final_response: Option<String>,
    router_invocations: usize,
}

impl SharedState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            next_action: NextAction::Start,
            context: SupportContext::new(),
            trail: Vec::new(),
            final_response: None,
            router_invocations: 0,
        }
    }

    pub fn with_context(mut self, context: SupportContext) -> Self {
        self.context = context;
        self
    }

    /// Seeds pass-through data; reserved keys are handed back.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert_extra(key, value);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn next_action(&self) -> NextAction {
        self.next_action
    }

    pub fn context(&self) -> &SupportContext {
        &self.context
    }

    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    pub fn has_final_response(&self) -> bool {
        self.final_response
            .as_deref()
            .is_some_and(|text| !text.is_empty())
    }

    pub fn router_invocations(&self) -> usize {
        self.router_invocations
    }

    pub fn data_result(&self) -> Option<&DataResult> {
        self.context.data_query_result()
    }

    pub fn support_request(&self) -> Option<&str> {
        self.context.support_request()
    }

    pub fn append_trail(&mut self, entry: impl Into<String>) {
        self.trail.push(entry.into());
    }

    /// Records the answer unless one is already present; returns whether it
    /// was stored.
    pub fn set_final_response(&mut self, text: impl Into<String>) -> bool {
        if self.final_response.is_some() {
            return false;
        }
        self.final_response = Some(text.into());
        true
    }

    /// Opens a fresh data request on behalf of the response worker.
    pub fn set_support_request(&mut self, code: impl Into<String>) {
        self.context.open_support_request(code);
    }

    pub fn take_support_request(&mut self) -> Option<String> {
        self.context.take_support_request()
    }

    pub fn set_data_result(&mut self, result: DataResult) {
        self.context.set_data_result(result);
    }

    pub(crate) fn set_next_action(&mut self, action: NextAction) {
        self.next_action = action;
    }

    pub(crate) fn record_router_invocation(&mut self) {
        self.router_invocations += 1;
    }

    /// Installs the context produced by the data worker.
    pub(crate) fn replace_context(&mut self, context: SupportContext) {
        self.context = context;
    }
}
