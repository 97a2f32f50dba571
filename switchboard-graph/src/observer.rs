use switchboard_core::{NextAction, Value};

/// Synchronous hooks fired by [`crate::SupportGraph`] as a run advances.
///
/// Node names are `router`, `data_worker` and `response_worker`.
pub trait Observer: Send + Sync {
    fn on_node_enter(&self, _node: &str) {}
    fn on_node_exit(&self, _node: &str) {}
    fn on_route(&self, _action: NextAction, _trail: &str) {}
    fn on_tool_call(&self, _tool: &str, _args: &Value) {}
    fn on_error(&self, _node: &str, _error: &str) {}
}
