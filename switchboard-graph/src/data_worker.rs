use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use switchboard_core::{
    value_preview, with_timeout, DataResult, SelectionRequest, SupportContext, ToolError,
    ToolSelection, ToolSelector, Value,
};
use switchboard_tools::ToolRegistry;

use crate::rules::{CompositeRule, DataRules};
use crate::Observer;

pub const NO_TOOL_SELECTED: &str = "no tool selected";
pub const COMPOSITE_TYPE: &str = "customer_ticket_summary";

/// Context after the data worker ran, plus its trail entry.
#[derive(Clone, Debug, PartialEq)]
pub struct DataOutcome {
    pub context: SupportContext,
    pub trail: String,
}

/// Selects and runs a tool, then records the result in the context.
///
/// Failures never escape: they become `{"error": ...}` results so the
/// router can carry on.
pub struct DataWorker {
    selector: Arc<dyn ToolSelector>,
    registry: ToolRegistry,
    rules: DataRules,
}

impl DataWorker {
    pub fn new(selector: Arc<dyn ToolSelector>, registry: ToolRegistry, rules: DataRules) -> Self {
        Self {
            selector,
            registry,
            rules,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &DataRules {
        &self.rules
    }

    pub async fn act(
        &self,
        query: &str,
        context: &SupportContext,
        call_timeout: Duration,
        observer: Option<&dyn Observer>,
    ) -> DataOutcome {
        let mut next = context.clone();
        let request = next.take_support_request();

        let specs = self.registry.to_specs();
        let selection = with_timeout(
            call_timeout,
            self.selector.select(SelectionRequest {
                query,
                support_request: request.as_deref(),
                context,
                tools: &specs,
            }),
        )
        .await;

        let selection = match selection {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                tracing::warn!("data worker did not select a tool");
                next.set_data_result(DataResult::error(NO_TOOL_SELECTED).answering(request));
                return DataOutcome {
                    context: next,
                    trail: "Data Agent did not make a tool call.".to_string(),
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "tool selector failed");
                next.set_data_result(
                    DataResult::error(format!("{NO_TOOL_SELECTED}: {err}")).answering(request),
                );
                return DataOutcome {
                    context: next,
                    trail: "Data Agent did not make a tool call.".to_string(),
                };
            }
        };

        let selection = match &self.rules.profile_override {
            Some(rule) => rule.apply(selection, request.as_deref(), &self.registry),
            None => selection,
        };
        tracing::info!(tool = %selection.name, "tool selected");
        tracing::debug!(args = %selection.arguments, "tool arguments");

        if let Some(rule) = self
            .rules
            .composite
            .as_ref()
            .filter(|rule| rule.matches(&selection, query))
        {
            let payload = self
                .compose(rule, &selection, query, call_timeout, observer)
                .await;
            next.set_data_result(DataResult::new(payload).answering(request));
            return DataOutcome {
                context: next,
                trail: format!(
                    "Executed {} + {} (composed)",
                    rule.list_tool, rule.history_tool
                ),
            };
        }

        let payload = self.execute(&selection, call_timeout, observer).await;
        next.set_data_result(DataResult::new(payload).answering(request));
        DataOutcome {
            context: next,
            trail: format!("Executed {}", selection.name),
        }
    }

    /// Runs one tool; every failure is folded into an `error` payload.
    async fn execute(
        &self,
        selection: &ToolSelection,
        call_timeout: Duration,
        observer: Option<&dyn Observer>,
    ) -> Value {
        match self.call(selection, call_timeout, observer).await {
            Ok(payload) => payload,
            Err(err) => error_payload(format!("Tool execution failed: {err}")),
        }
    }

    async fn call(
        &self,
        selection: &ToolSelection,
        call_timeout: Duration,
        observer: Option<&dyn Observer>,
    ) -> Result<Value, ToolError> {
        if let Some(observer) = observer {
            observer.on_tool_call(&selection.name, &selection.arguments);
        }
        let result = self
            .registry
            .invoke_with_timeout(&selection.name, selection.arguments.clone(), call_timeout)
            .await;
        match &result {
            Ok(payload) => tracing::info!(
                tool = %selection.name,
                preview = %value_preview(payload, 120),
                "tool succeeded"
            ),
            Err(err) => tracing::warn!(tool = %selection.name, error = %err, "tool failed"),
        }
        result
    }

    async fn compose(
        &self,
        rule: &CompositeRule,
        selection: &ToolSelection,
        query: &str,
        call_timeout: Duration,
        observer: Option<&dyn Observer>,
    ) -> Value {
        let listed = match self.call(selection, call_timeout, observer).await {
            Ok(listed) => listed,
            Err(err) => return error_payload(format!("Error in {}: {err}", rule.list_tool)),
        };
        let customers = match listed.get("customers").and_then(Value::as_array) {
            Some(customers) if listed.get("error").is_none() => customers.clone(),
            _ => {
                let message = listed
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("list call returned no customers");
                return error_payload(format!("Error in {}: {message}", rule.list_tool));
            }
        };

        let histories = join_all(customers.iter().map(|customer| {
            self.history_of(rule, customer, call_timeout, observer)
        }))
        .await;

        let open_only = rule.open_only(query);
        let summary: Vec<Value> = customers
            .iter()
            .zip(histories)
            .filter_map(|(customer, history)| rule.summarize(customer, history, open_only))
            .collect();
        tracing::info!(customers = summary.len(), "composed ticket summary");

        serde_json::json!({
            "type": COMPOSITE_TYPE,
            "customers": summary,
        })
    }

    async fn history_of(
        &self,
        rule: &CompositeRule,
        customer: &Value,
        call_timeout: Duration,
        observer: Option<&dyn Observer>,
    ) -> Result<Vec<Value>, String> {
        let Some(id) = customer.get("id").cloned() else {
            return Err("customer record has no id".to_string());
        };
        let call = ToolSelection::new(
            rule.history_tool.clone(),
            serde_json::json!({ "customer_id": id }),
        );
        let payload = self
            .call(&call, call_timeout, observer)
            .await
            .map_err(|err| err.to_string())?;
        if let Some(message) = failure_message(&payload) {
            return Err(message);
        }
        Ok(payload
            .get("tickets")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

fn error_payload(message: String) -> Value {
    serde_json::json!({ "error": message })
}

fn failure_message(payload: &Value) -> Option<String> {
    let message = payload.get("error").and_then(Value::as_str);
    let failed = payload.get("success").and_then(Value::as_bool) == Some(false);
    match (message, failed) {
        (Some(message), _) => Some(message.to_string()),
        (None, true) => Some("history call failed".to_string()),
        (None, false) => None,
    }
}
