use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{Tool, ToolError, Value};
use switchboard_tools::ToolRegistry;

struct EchoTool;

struct SlowTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "echoes"
    }

    fn schema(&self) -> Value {
        Value::from("echo-schema")
    }

    async fn invoke(&self, input: Value) -> Result<Value, ToolError> {
        Ok(input)
    }
}

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "alpha_slow"
    }

    fn description(&self) -> &str {
        "never answers in time"
    }

    fn schema(&self) -> Value {
        Value::from("slow-schema")
    }

    async fn invoke(&self, _input: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn invokes_registered_tool_by_name() {
    let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));

    let output = registry
        .invoke("echo", serde_json::json!({"k": 1}))
        .await
        .unwrap();
    assert_eq!(output, serde_json::json!({"k": 1}));
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let registry = ToolRegistry::new();

    let err = registry.invoke("nope", Value::Null).await.unwrap_err();
    assert!(matches!(err, ToolError::NotFound(name) if name == "nope"));
}

#[tokio::test]
async fn invoke_with_timeout_gives_up() {
    let registry = ToolRegistry::new().with_tool(Arc::new(SlowTool));

    let err = registry
        .invoke_with_timeout("alpha_slow", Value::Null, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Timeout(limit) if limit == Duration::from_millis(20)));
}

#[test]
fn specs_and_names_are_sorted() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(SlowTool));

    assert_eq!(registry.names(), vec!["alpha_slow", "echo"]);
    let specs = registry.to_specs();
    assert_eq!(specs[0].name, "alpha_slow");
    assert_eq!(specs[1].parameters, Value::from("echo-schema"));
}

#[test]
fn re_registering_replaces_previous_tool() {
    let mut registry = ToolRegistry::new();
    assert!(registry.register(Arc::new(EchoTool)).is_none());
    assert!(registry.register(Arc::new(EchoTool)).is_some());
    assert_eq!(registry.len(), 1);
}
