//! Runs the assignment scenarios through the support pipeline with
//! keyword-driven decision functions, against a seeded store.
//!
//! `SWITCHBOARD_DATABASE_URL` selects the database (default
//! `sqlite::memory:`); `RUST_LOG` controls log output.

use std::sync::Arc;

use serde_json::json;
use switchboard_core::{
    ResponseDrafter, RouteDecider, SelectionRequest, SupportContext, SwitchboardError,
    ToolSelection, ToolSelector,
};
use switchboard_graph::SupportGraph;
use switchboard_store::{
    CustomerStatus, CustomerStore, NewCustomer, NewTicket, Priority, SqliteCustomerStore,
    TicketStatus,
};
use switchboard_tools::customer_registry;
use tracing_subscriber::EnvFilter;

const SCENARIOS: [&str; 5] = [
    "Get customer information for ID 5",
    "I'm customer 1 and need help upgrading my account",
    "Show me all active customers who have open tickets",
    "My ID is 5. I've been charged twice, please refund immediately!",
    "Update my email to new@email.com and show my ticket history. My customer ID is 1.",
];

fn customer_id(text: &str) -> Option<i64> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}

fn email_in(text: &str) -> Option<&str> {
    text.split_whitespace()
        .find(|word| word.contains('@'))
        .map(|word| word.trim_end_matches(|c: char| !c.is_alphanumeric()))
}

/// Sends anything mentioning records to the data worker until data arrives.
struct KeywordRouter;

#[async_trait::async_trait]
impl RouteDecider for KeywordRouter {
    async fn decide(
        &self,
        query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        if context.data_query_result().is_some() {
            return Ok("SUPPORT_AGENT".to_string());
        }
        let lower = query.to_lowercase();
        let wants_data = ["information", "customers", "update", "history", "charged"]
            .iter()
            .any(|word| lower.contains(word));
        Ok(if wants_data { "DATA_AGENT" } else { "SUPPORT_AGENT" }.to_string())
    }
}

struct KeywordSelector;

#[async_trait::async_trait]
impl ToolSelector for KeywordSelector {
    async fn select(
        &self,
        request: SelectionRequest<'_>,
    ) -> Result<Option<ToolSelection>, SwitchboardError> {
        let lower = request.query.to_lowercase();
        let id = customer_id(request.query);

        if lower.contains("all active customers") {
            return Ok(Some(ToolSelection::new(
                "list_customers",
                json!({ "status": "active" }),
            )));
        }
        let Some(id) = id else {
            return Ok(None);
        };
        let selection = if lower.contains("update my email") && request.support_request.is_none()
        {
            match email_in(request.query) {
                Some(email) => ToolSelection::new(
                    "update_customer",
                    json!({ "customer_id": id, "data": { "email": email } }),
                ),
                None => return Ok(None),
            }
        } else if lower.contains("refund") || lower.contains("charged twice") {
            ToolSelection::new(
                "create_ticket",
                json!({
                    "customer_id": id,
                    "issue": "Charged twice, refund requested",
                    "priority": "high"
                }),
            )
        } else if lower.contains("information") {
            ToolSelection::new("get_customer", json!({ "customer_id": id }))
        } else {
            // Profile requests are redirected by the data worker's rules.
            ToolSelection::new("get_customer_history", json!({ "customer_id": id }))
        };
        Ok(Some(selection))
    }
}

/// Asks for the profile once, then summarises whatever data is present.
struct TemplateDrafter;

#[async_trait::async_trait]
impl ResponseDrafter for TemplateDrafter {
    async fn draft(
        &self,
        query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        let Some(result) = context.data_query_result() else {
            return Ok(match customer_id(query) {
                Some(id) => format!("ROUTING_REQUEST: CUSTOMER_PROFILE_{id}"),
                None => "Thanks for reaching out. Could you share your customer ID?".to_string(),
            });
        };
        if let Some(message) = result.error_message() {
            return Ok(format!(
                "We could not look that up ({message}). A specialist will follow up."
            ));
        }
        let payload = &result.payload;
        let reply = if let Some(customer) = payload.get("customer") {
            format!(
                "Customer {} ({}) is {}. How else can we help?",
                customer["name"].as_str().unwrap_or("unknown"),
                customer["email"].as_str().unwrap_or("no email"),
                customer["status"].as_str().unwrap_or("unknown"),
            )
        } else if let Some(ticket) = payload.get("ticket") {
            format!(
                "We opened ticket #{} with {} priority. Our billing team will contact you shortly.",
                ticket["id"], ticket["priority"].as_str().unwrap_or("medium")
            )
        } else if let Some(customers) = payload.get("customers").and_then(|c| c.as_array()) {
            let names: Vec<&str> = customers
                .iter()
                .filter_map(|c| c["name"].as_str())
                .collect();
            format!("{} customer(s) match: {}", names.len(), names.join(", "))
        } else {
            format!("Here is what we found: {payload}")
        };
        Ok(reply)
    }
}

async fn seed(store: &dyn CustomerStore) -> anyhow::Result<()> {
    let customers = [
        ("John Doe", "john.doe@example.com", CustomerStatus::Active),
        ("Jane Smith", "jane.smith@example.com", CustomerStatus::Active),
        ("Bob Johnson", "bob.johnson@example.com", CustomerStatus::Disabled),
        ("Alice Williams", "alice.w@example.com", CustomerStatus::Active),
        ("Charlie Brown", "charlie.brown@example.com", CustomerStatus::Active),
    ];
    for (name, email, status) in customers {
        store
            .add_customer(NewCustomer::new(name).email(email).status(status))
            .await?;
    }

    store
        .add_ticket(NewTicket::new(1, "Cannot login to account").priority(Priority::High))
        .await?;
    store
        .add_ticket(
            NewTicket::new(2, "Password reset not working").status(TicketStatus::InProgress),
        )
        .await?;
    store
        .add_ticket(NewTicket::new(4, "Feature request: dark mode").priority(Priority::Low))
        .await?;
    store
        .add_ticket(
            NewTicket::new(5, "Invoice shows wrong amount").status(TicketStatus::Resolved),
        )
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = std::env::var("SWITCHBOARD_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite::memory:".to_string());
    let store = Arc::new(SqliteCustomerStore::builder(&database_url).build().await?);
    seed(store.as_ref()).await?;
    tracing::info!(database_url = %database_url, "store ready");

    let graph = SupportGraph::builder()
        .route_decider(Arc::new(KeywordRouter))
        .tool_selector(Arc::new(KeywordSelector))
        .response_drafter(Arc::new(TemplateDrafter))
        .registry(customer_registry(store.clone()))
        .build()?;

    for query in SCENARIOS {
        println!("\nUSER: {query}");
        let outcome = graph.invoke(query).await?;
        for entry in outcome.state.trail() {
            println!("  - {entry}");
        }
        println!("ASSISTANT: {}", outcome.user_response());
    }

    Ok(())
}
