use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Value;

pub const DATA_QUERY_RESULT_KEY: &str = "data_query_result";
pub const SUPPORT_REQUEST_KEY: &str = "support_request";

/// The step the orchestrator should take next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    #[default]
    Start,
    DataAgent,
    SupportAgent,
    Router,
    Complete,
    Escalate,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::Start => "START",
            NextAction::DataAgent => "DATA_AGENT",
            NextAction::SupportAgent => "SUPPORT_AGENT",
            NextAction::Router => "ROUTER",
            NextAction::Complete => "COMPLETE",
            NextAction::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent data worker step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataResult {
    pub payload: Value,
    /// Request code this result was fetched for, if one was pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers_request: Option<String>,
}

impl DataResult {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            answers_request: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(json!({ "error": message.into() }))
    }

    pub fn answering(mut self, request: Option<String>) -> Self {
        self.answers_request = request;
        self
    }

    pub fn answers(&self, request: &str) -> bool {
        self.answers_request.as_deref() == Some(request)
    }

    /// Error text of a failed fetch, either a captured fault (`error`) or a
    /// tool payload with `success: false`.
    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
            || self.payload.get("success").and_then(Value::as_bool) == Some(false)
    }
}

/// Context threaded through a run.
///
/// `data_query_result` is written only by the data worker and
/// `support_request` only by the response worker; `extra` carries caller
/// data through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_query_result: Option<DataResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    support_request: Option<String>,
    #[serde(default, flatten)]
    extra: BTreeMap<String, Value>,
}

impl SupportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_query_result(&self) -> Option<&DataResult> {
        self.data_query_result.as_ref()
    }

    pub fn support_request(&self) -> Option<&str> {
        self.support_request.as_deref()
    }

    pub fn has_support_request(&self) -> bool {
        self.support_request.is_some()
    }

    pub fn set_data_result(&mut self, result: DataResult) {
        self.data_query_result = Some(result);
    }

    pub fn set_support_request(&mut self, code: impl Into<String>) {
        self.support_request = Some(code.into());
    }

    /// Opens a new request. A result already present predates it and no
    /// longer counts as its answer.
    pub fn open_support_request(&mut self, code: impl Into<String>) {
        if let Some(result) = &mut self.data_query_result {
            result.answers_request = None;
        }
        self.support_request = Some(code.into());
    }

    pub fn take_support_request(&mut self) -> Option<String> {
        self.support_request.take()
    }

    /// True when a request is pending that the current data result was not
    /// fetched for.
    pub fn has_unanswered_request(&self) -> bool {
        match (&self.support_request, &self.data_query_result) {
            (None, _) => false,
            (Some(request), Some(result)) => !result.answers(request),
            (Some(_), None) => true,
        }
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Inserts pass-through data. The reserved keys are rejected and returned
    /// back to the caller.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if key == DATA_QUERY_RESULT_KEY || key == SUPPORT_REQUEST_KEY {
            return Some(value);
        }
        self.extra.insert(key, value);
        None
    }

    /// Flat JSON view handed to decision functions: reserved keys hold the
    /// raw payload / request code, extras sit alongside them.
    pub fn prompt_view(&self) -> Value {
        let mut view = serde_json::Map::new();
        for (key, value) in &self.extra {
            view.insert(key.clone(), value.clone());
        }
        if let Some(result) = &self.data_query_result {
            view.insert(DATA_QUERY_RESULT_KEY.to_string(), result.payload.clone());
        }
        if let Some(request) = &self.support_request {
            view.insert(
                SUPPORT_REQUEST_KEY.to_string(),
                Value::String(request.clone()),
            );
        }
        Value::Object(view)
    }
}
