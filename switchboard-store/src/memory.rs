use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::model::timestamp_now;
use crate::{
    Customer, CustomerPatch, CustomerStatus, CustomerStore, NewCustomer, NewTicket, Priority,
    StoreError, Ticket,
};

#[derive(Default)]
struct Tables {
    customers: BTreeMap<i64, Customer>,
    tickets: Vec<Ticket>,
    next_customer_id: i64,
    next_ticket_id: i64,
}

#[derive(Default, Clone)]
pub struct InMemoryCustomerStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn get_customer(&self, customer_id: i64) -> Result<Customer, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        guard
            .customers
            .get(&customer_id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound { customer_id })
    }

    async fn list_customers(
        &self,
        status: Option<CustomerStatus>,
        limit: u32,
    ) -> Result<Vec<Customer>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .customers
            .values()
            .filter(|customer| status.map_or(true, |status| customer.status == status))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Validation("No valid fields to update".to_string()));
        }
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let customer = guard
            .customers
            .get_mut(&customer_id)
            .ok_or(StoreError::CustomerNotFound { customer_id })?;
        patch.apply(customer);
        customer.updated_at = timestamp_now();
        Ok(customer.clone())
    }

    async fn create_ticket(
        &self,
        customer_id: i64,
        issue: &str,
        priority: Priority,
    ) -> Result<Ticket, StoreError> {
        self.add_ticket(NewTicket::new(customer_id, issue).priority(priority))
            .await
    }

    async fn customer_history(&self, customer_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        if !guard.customers.contains_key(&customer_id) {
            return Err(StoreError::CustomerNotFound { customer_id });
        }
        let mut history: Vec<Ticket> = guard
            .tickets
            .iter()
            .filter(|ticket| ticket.customer_id == customer_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(history)
    }

    async fn add_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        guard.next_customer_id += 1;
        let now = timestamp_now();
        let created = Customer {
            id: guard.next_customer_id,
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            status: customer.status,
            created_at: now.clone(),
            updated_at: now,
        };
        guard.customers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn add_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if !guard.customers.contains_key(&ticket.customer_id) {
            return Err(StoreError::CustomerNotFound {
                customer_id: ticket.customer_id,
            });
        }
        guard.next_ticket_id += 1;
        let created = Ticket {
            id: guard.next_ticket_id,
            customer_id: ticket.customer_id,
            issue: ticket.issue,
            status: ticket.status,
            priority: ticket.priority,
            created_at: timestamp_now(),
        };
        guard.tickets.push(created.clone());
        Ok(created)
    }
}
