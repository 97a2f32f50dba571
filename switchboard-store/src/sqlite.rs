use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use crate::migrations::run_migrations;
use crate::model::timestamp_now;
use crate::{
    Customer, CustomerPatch, CustomerStatus, CustomerStore, NewCustomer, NewTicket, Priority,
    StoreError, Ticket, TicketStatus,
};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, status, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, customer_id, issue, status, priority, created_at";

#[derive(Debug, Clone)]
pub struct SqliteCustomerStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SqliteCustomerStoreBuilder {
    database_url: String,
    max_connections: u32,
}

impl SqliteCustomerStore {
    pub fn builder(database_url: impl Into<String>) -> SqliteCustomerStoreBuilder {
        SqliteCustomerStoreBuilder {
            database_url: database_url.into(),
            max_connections: 1,
        }
    }

    /// Wraps an existing pool. Migrations are the caller's responsibility.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SqliteCustomerStoreBuilder {
    /// `sqlite::memory:` gives every connection its own database, so keep the
    /// default of one connection for in-memory URLs.
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub async fn build(self) -> Result<SqliteCustomerStore, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(StoreError::Connection)?;

        run_migrations(&pool).await?;
        tracing::debug!(database_url = %self.database_url, "customer store ready");

        Ok(SqliteCustomerStore { pool })
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Customer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        status: status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("customer status '{status}'")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket, StoreError> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    Ok(Ticket {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        issue: row.try_get("issue")?,
        status: status
            .parse::<TicketStatus>()
            .map_err(|_| StoreError::Corrupt(format!("ticket status '{status}'")))?,
        priority: priority
            .parse::<Priority>()
            .map_err(|_| StoreError::Corrupt(format!("ticket priority '{priority}'")))?,
        created_at: row.try_get("created_at")?,
    })
}

async fn fetch_customer(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<Option<Customer>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
    ))
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(customer_from_row).transpose()
}

async fn fetch_ticket(conn: &mut SqliteConnection, ticket_id: i64) -> Result<Ticket, StoreError> {
    let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"))
        .bind(ticket_id)
        .fetch_one(conn)
        .await?;
    ticket_from_row(&row)
}

impl SqliteCustomerStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut tx = self.pool.begin().await?;

        if fetch_customer(&mut tx, ticket.customer_id).await?.is_none() {
            return Err(StoreError::CustomerNotFound {
                customer_id: ticket.customer_id,
            });
        }

        let inserted = sqlx::query(
            "INSERT INTO tickets (customer_id, issue, status, priority, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(ticket.customer_id)
        .bind(&ticket.issue)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(timestamp_now())
        .execute(&mut *tx)
        .await?;

        let created = fetch_ticket(&mut tx, inserted.last_insert_rowid()).await?;
        tx.commit().await?;

        tracing::debug!(
            ticket_id = created.id,
            customer_id = created.customer_id,
            "ticket created"
        );
        Ok(created)
    }
}

#[async_trait::async_trait]
impl CustomerStore for SqliteCustomerStore {
    async fn get_customer(&self, customer_id: i64) -> Result<Customer, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, customer_id)
            .await?
            .ok_or(StoreError::CustomerNotFound { customer_id })
    }

    async fn list_customers(
        &self,
        status: Option<CustomerStatus>,
        limit: u32,
    ) -> Result<Vec<Customer>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE status = ? ORDER BY id LIMIT ?"
                ))
                .bind(status.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id LIMIT ?"
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(customer_from_row).collect()
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Validation("No valid fields to update".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        if fetch_customer(&mut tx, customer_id).await?.is_none() {
            return Err(StoreError::CustomerNotFound { customer_id });
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE customers SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = patch.name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = patch.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(phone) = patch.phone {
            fields.push("phone = ").push_bind_unseparated(phone);
        }
        if let Some(status) = patch.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        fields.push("updated_at = ").push_bind_unseparated(timestamp_now());
        builder.push(" WHERE id = ").push_bind(customer_id);
        builder.build().execute(&mut *tx).await?;

        let updated = fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or(StoreError::CustomerNotFound { customer_id })?;
        tx.commit().await?;

        tracing::debug!(customer_id, "customer updated");
        Ok(updated)
    }

    async fn create_ticket(
        &self,
        customer_id: i64,
        issue: &str,
        priority: Priority,
    ) -> Result<Ticket, StoreError> {
        self.insert_ticket(NewTicket::new(customer_id, issue).priority(priority))
            .await
    }

    async fn customer_history(&self, customer_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        if fetch_customer(&mut conn, customer_id).await?.is_none() {
            return Err(StoreError::CustomerNotFound { customer_id });
        }

        let rows = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE customer_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(ticket_from_row).collect()
    }

    async fn add_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now = timestamp_now();

        let inserted = sqlx::query(
            "INSERT INTO customers (name, email, phone, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let customer_id = inserted.last_insert_rowid();
        let created = fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or(StoreError::CustomerNotFound { customer_id })?;
        tx.commit().await?;
        Ok(created)
    }

    async fn add_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        self.insert_ticket(ticket).await
    }
}
