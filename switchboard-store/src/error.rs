use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Customer {customer_id} not found")]
    CustomerNotFound { customer_id: i64 },
    #[error("{0}")]
    Validation(String),
    #[error("failed to connect to store: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("failed to run store migrations: {0}")]
    Migration(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Domain failures the caller can explain to a user, as opposed to
    /// faults in the storage layer itself.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            StoreError::CustomerNotFound { .. } | StoreError::Validation(_)
        )
    }
}
