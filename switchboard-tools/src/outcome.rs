use serde::Serialize;
use serde_json::json;
use switchboard_core::{ToolError, Value};
use switchboard_store::StoreError;

/// `{"success": true, <key>: <value>}` payload.
pub fn success<T: Serialize>(key: &str, value: T) -> Result<Value, ToolError> {
    let mut payload = serde_json::Map::new();
    payload.insert("success".to_string(), Value::Bool(true));
    payload.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(Value::Object(payload))
}

/// `{"success": true, "count": n, <key>: [...]}` payload.
pub fn success_list<T: Serialize>(key: &str, items: Vec<T>) -> Result<Value, ToolError> {
    let mut payload = serde_json::Map::new();
    payload.insert("success".to_string(), Value::Bool(true));
    payload.insert("count".to_string(), Value::from(items.len()));
    payload.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(Value::Object(payload))
}

pub fn failure(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}

/// Domain errors become a failure payload; storage faults propagate.
pub fn from_store_error(error: StoreError) -> Result<Value, ToolError> {
    if error.is_domain() {
        Ok(failure(error.to_string()))
    } else {
        Err(ToolError::ExecutionFailed(error.to_string()))
    }
}

/// Tools report success in-band; a payload without `success: true` is a failure.
pub fn is_success(payload: &Value) -> bool {
    payload.get("success").and_then(Value::as_bool) == Some(true)
}
