use crate::schema::MIGRATION_STATEMENTS_SQL;
use crate::StoreError;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in MIGRATION_STATEMENTS_SQL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StoreError::Migration)?;
    }

    Ok(())
}
