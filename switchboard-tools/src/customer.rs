//! The five customer-service tools over a [`CustomerStore`].

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use switchboard_core::{Tool, ToolError, Value};
use switchboard_store::{CustomerPatch, CustomerStatus, CustomerStore, Priority};

use crate::outcome::{failure, from_store_error, success, success_list};
use crate::ToolRegistry;

pub const GET_CUSTOMER: &str = "get_customer";
pub const LIST_CUSTOMERS: &str = "list_customers";
pub const UPDATE_CUSTOMER: &str = "update_customer";
pub const CREATE_TICKET: &str = "create_ticket";
pub const GET_CUSTOMER_HISTORY: &str = "get_customer_history";

pub const DEFAULT_LIST_LIMIT: u32 = 50;
const UPDATABLE_FIELDS: [&str; 4] = ["name", "email", "phone", "status"];

/// Registers all five tools against `store`.
pub fn register_customer_tools(registry: &mut ToolRegistry, store: Arc<dyn CustomerStore>) {
    registry.register(Arc::new(GetCustomerTool::new(store.clone())));
    registry.register(Arc::new(ListCustomersTool::new(store.clone())));
    registry.register(Arc::new(UpdateCustomerTool::new(store.clone())));
    registry.register(Arc::new(CreateTicketTool::new(store.clone())));
    registry.register(Arc::new(CustomerHistoryTool::new(store)));
}

pub fn customer_registry(store: Arc<dyn CustomerStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_customer_tools(&mut registry, store);
    registry
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    // Some models send `{}` as `null` for tools without required arguments.
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|err| ToolError::InvalidInput(format!("{tool}: {err}")))
}

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// Accepts `5` as well as `"5"`; models are inconsistent about id types.
fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CustomerIdArgs {
    #[serde(deserialize_with = "lenient_id")]
    #[schemars(with = "i64")]
    pub customer_id: i64,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListCustomersArgs {
    /// `active` or `disabled`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCustomerArgs {
    #[serde(deserialize_with = "lenient_id")]
    #[schemars(with = "i64")]
    pub customer_id: i64,
    /// Any of `name`, `email`, `phone`, `status`; other keys are ignored.
    pub data: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTicketArgs {
    #[serde(deserialize_with = "lenient_id")]
    #[schemars(with = "i64")]
    pub customer_id: i64,
    pub issue: String,
    /// `low`, `medium` (default) or `high`.
    #[serde(default)]
    pub priority: Option<String>,
}

pub struct GetCustomerTool {
    store: Arc<dyn CustomerStore>,
}

impl GetCustomerTool {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for GetCustomerTool {
    fn name(&self) -> &str {
        GET_CUSTOMER
    }

    fn description(&self) -> &str {
        "Retrieve a customer by ID"
    }

    fn schema(&self) -> Value {
        schema_of::<CustomerIdArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: CustomerIdArgs = parse_args(GET_CUSTOMER, args)?;
        match self.store.get_customer(args.customer_id).await {
            Ok(customer) => success("customer", customer),
            Err(err) => from_store_error(err),
        }
    }
}

pub struct ListCustomersTool {
    store: Arc<dyn CustomerStore>,
}

impl ListCustomersTool {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for ListCustomersTool {
    fn name(&self) -> &str {
        LIST_CUSTOMERS
    }

    fn description(&self) -> &str {
        "List customers, optionally by status, with optional limit"
    }

    fn schema(&self) -> Value {
        schema_of::<ListCustomersArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: ListCustomersArgs = parse_args(LIST_CUSTOMERS, args)?;
        let status = match args.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<CustomerStatus>() {
                Ok(status) => Some(status),
                Err(err) => return Ok(failure(err.to_string())),
            },
            None => None,
        };
        let limit = args.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        match self.store.list_customers(status, limit).await {
            Ok(customers) => success_list("customers", customers),
            Err(err) => from_store_error(err),
        }
    }
}

pub struct UpdateCustomerTool {
    store: Arc<dyn CustomerStore>,
}

impl UpdateCustomerTool {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }
}

/// Keeps only the updatable fields holding strings.
fn patch_from_fields(data: &serde_json::Map<String, Value>) -> Result<CustomerPatch, String> {
    let mut patch = CustomerPatch::default();
    for (key, value) in data {
        if !UPDATABLE_FIELDS.contains(&key.as_str()) {
            tracing::debug!(field = %key, "ignoring non-updatable customer field");
            continue;
        }
        let Some(text) = value.as_str() else {
            tracing::debug!(field = %key, "ignoring non-string customer field");
            continue;
        };
        match key.as_str() {
            "name" => patch.name = Some(text.to_string()),
            "email" => patch.email = Some(text.to_string()),
            "phone" => patch.phone = Some(text.to_string()),
            "status" => {
                patch.status = Some(text.parse::<CustomerStatus>().map_err(|e| e.to_string())?)
            }
            _ => {}
        }
    }
    Ok(patch)
}

#[async_trait::async_trait]
impl Tool for UpdateCustomerTool {
    fn name(&self) -> &str {
        UPDATE_CUSTOMER
    }

    fn description(&self) -> &str {
        "Update customer fields"
    }

    fn schema(&self) -> Value {
        schema_of::<UpdateCustomerArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: UpdateCustomerArgs = parse_args(UPDATE_CUSTOMER, args)?;
        let patch = match patch_from_fields(&args.data) {
            Ok(patch) => patch,
            Err(message) => return Ok(failure(message)),
        };
        if patch.is_empty() {
            return Ok(failure("No valid fields to update"));
        }
        match self.store.update_customer(args.customer_id, patch).await {
            Ok(customer) => success("customer", customer),
            Err(err) => from_store_error(err),
        }
    }
}

pub struct CreateTicketTool {
    store: Arc<dyn CustomerStore>,
}

impl CreateTicketTool {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CreateTicketTool {
    fn name(&self) -> &str {
        CREATE_TICKET
    }

    fn description(&self) -> &str {
        "Create a support ticket for a customer"
    }

    fn schema(&self) -> Value {
        schema_of::<CreateTicketArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: CreateTicketArgs = parse_args(CREATE_TICKET, args)?;
        let priority = match args.priority.as_deref() {
            Some(raw) => match raw.parse::<Priority>() {
                Ok(priority) => priority,
                Err(err) => return Ok(failure(err.to_string())),
            },
            None => Priority::default(),
        };
        match self
            .store
            .create_ticket(args.customer_id, &args.issue, priority)
            .await
        {
            Ok(ticket) => success("ticket", ticket),
            Err(err) => from_store_error(err),
        }
    }
}

pub struct CustomerHistoryTool {
    store: Arc<dyn CustomerStore>,
}

impl CustomerHistoryTool {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CustomerHistoryTool {
    fn name(&self) -> &str {
        GET_CUSTOMER_HISTORY
    }

    fn description(&self) -> &str {
        "Get all tickets for a customer"
    }

    fn schema(&self) -> Value {
        schema_of::<CustomerIdArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: CustomerIdArgs = parse_args(GET_CUSTOMER_HISTORY, args)?;
        match self.store.customer_history(args.customer_id).await {
            Ok(tickets) => success_list("tickets", tickets),
            Err(err) => from_store_error(err),
        }
    }
}
