//! Pattern rules the data worker applies on top of the selector's choice.

use serde_json::json;
use switchboard_core::{ToolSelection, Value};
use switchboard_tools::ToolRegistry;

/// Redirects profile requests to the profile tool.
///
/// Fires when the pending request code contains `marker` (case-insensitive),
/// the selector picked some other tool with an `id_argument`, and the
/// registry holds `profile_tool`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileOverrideRule {
    pub marker: String,
    pub profile_tool: String,
    pub id_argument: String,
}

impl Default for ProfileOverrideRule {
    fn default() -> Self {
        Self {
            marker: "PROFILE".to_string(),
            profile_tool: "get_customer".to_string(),
            id_argument: "customer_id".to_string(),
        }
    }
}

impl ProfileOverrideRule {
    pub fn apply(
        &self,
        selection: ToolSelection,
        request: Option<&str>,
        registry: &ToolRegistry,
    ) -> ToolSelection {
        let Some(request) = request else {
            return selection;
        };
        if request.is_empty() || !request.to_uppercase().contains(&self.marker.to_uppercase()) {
            return selection;
        }
        if selection.name == self.profile_tool || !registry.contains(&self.profile_tool) {
            return selection;
        }
        let Some(id) = selection.argument(&self.id_argument).cloned() else {
            return selection;
        };
        tracing::info!(
            from = %selection.name,
            to = %self.profile_tool,
            "profile request overrides selected tool"
        );
        let mut arguments = serde_json::Map::new();
        arguments.insert(self.id_argument.clone(), id);
        ToolSelection::new(self.profile_tool.clone(), Value::Object(arguments))
    }
}

/// Expands a list call into a per-customer ticket summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeRule {
    pub list_tool: String,
    pub history_tool: String,
    pub trigger_keyword: String,
    pub open_keyword: String,
    pub open_status: String,
}

impl Default for CompositeRule {
    fn default() -> Self {
        Self {
            list_tool: "list_customers".to_string(),
            history_tool: "get_customer_history".to_string(),
            trigger_keyword: "ticket".to_string(),
            open_keyword: "open".to_string(),
            open_status: "open".to_string(),
        }
    }
}

impl CompositeRule {
    pub fn matches(&self, selection: &ToolSelection, query: &str) -> bool {
        selection.name == self.list_tool && query.to_lowercase().contains(&self.trigger_keyword)
    }

    pub fn open_only(&self, query: &str) -> bool {
        query.to_lowercase().contains(&self.open_keyword)
    }

    pub fn is_open(&self, ticket: &Value) -> bool {
        ticket.get("status").and_then(Value::as_str) == Some(self.open_status.as_str())
    }

    /// Builds one summary entry, or `None` when `open_only` drops it.
    pub(crate) fn summarize(
        &self,
        customer: &Value,
        history: Result<Vec<Value>, String>,
        open_only: bool,
    ) -> Option<Value> {
        let (tickets, history_error) = match history {
            Ok(tickets) => (tickets, None),
            Err(message) => (Vec::new(), Some(message)),
        };
        let open: Vec<Value> = tickets.iter().filter(|t| self.is_open(t)).cloned().collect();
        if open_only && open.is_empty() {
            return None;
        }

        let mut entry = json!({
            "customer_id": customer.get("id").cloned().unwrap_or(Value::Null),
            "name": customer.get("name").cloned().unwrap_or(Value::Null),
            "total_tickets": tickets.len(),
            "open_ticket_count": open.len(),
        });
        if let Some(fields) = entry.as_object_mut() {
            if open_only {
                fields.insert("open_tickets".to_string(), Value::Array(open));
            } else {
                fields.insert("tickets".to_string(), Value::Array(tickets));
            }
            if let Some(message) = history_error {
                fields.insert("history_error".to_string(), Value::String(message));
            }
        }
        Some(entry)
    }
}

/// The data worker's rule set. `None` disables a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRules {
    pub profile_override: Option<ProfileOverrideRule>,
    pub composite: Option<CompositeRule>,
}

impl Default for DataRules {
    fn default() -> Self {
        Self {
            profile_override: Some(ProfileOverrideRule::default()),
            composite: Some(CompositeRule::default()),
        }
    }
}

impl DataRules {
    pub fn none() -> Self {
        Self {
            profile_override: None,
            composite: None,
        }
    }
}
