//! Customer / ticket storage used by the data worker's tools.
//!
//! [`CustomerStore`] exposes the five operations the tools rely on plus two
//! seeding helpers. [`SqliteCustomerStore`] is the persistent backend and
//! [`InMemoryCustomerStore`] a lock-guarded map for tests and demos.
mod error;
mod memory;
pub mod migrations;
mod model;
pub mod schema;
mod sqlite;

pub use error::StoreError;
pub use memory::InMemoryCustomerStore;
pub use model::{
    Customer, CustomerPatch, CustomerStatus, NewCustomer, NewTicket, Priority, Ticket,
    TicketStatus,
};
pub use sqlite::{SqliteCustomerStore, SqliteCustomerStoreBuilder};

#[async_trait::async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_customer(&self, customer_id: i64) -> Result<Customer, StoreError>;

    /// Customers ordered by id, optionally filtered by status.
    async fn list_customers(
        &self,
        status: Option<CustomerStatus>,
        limit: u32,
    ) -> Result<Vec<Customer>, StoreError>;

    /// Applies `patch` atomically and returns the updated record.
    async fn update_customer(
        &self,
        customer_id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError>;

    /// Opens a new ticket for an existing customer.
    async fn create_ticket(
        &self,
        customer_id: i64,
        issue: &str,
        priority: Priority,
    ) -> Result<Ticket, StoreError>;

    /// All tickets of a customer, newest first.
    async fn customer_history(&self, customer_id: i64) -> Result<Vec<Ticket>, StoreError>;

    async fn add_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    async fn add_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;
}
