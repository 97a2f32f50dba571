pub const CUSTOMERS_TABLE: &str = "customers";
pub const TICKETS_TABLE: &str = "tickets";
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_CUSTOMERS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS customers (\
    id INTEGER PRIMARY KEY AUTOINCREMENT,\
    name TEXT NOT NULL,\
    email TEXT,\
    phone TEXT,\
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'disabled')),\
    created_at TEXT NOT NULL,\
    updated_at TEXT NOT NULL\
)";

pub const CREATE_TICKETS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS tickets (\
    id INTEGER PRIMARY KEY AUTOINCREMENT,\
    customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,\
    issue TEXT NOT NULL,\
    status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'in_progress', 'resolved')),\
    priority TEXT NOT NULL DEFAULT 'medium' CHECK (priority IN ('low', 'medium', 'high')),\
    created_at TEXT NOT NULL\
)";

pub const CREATE_TICKETS_CUSTOMER_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_tickets_customer_id ON tickets (customer_id)";

pub const MIGRATION_STATEMENTS_SQL: [&str; 3] = [
    CREATE_CUSTOMERS_TABLE_SQL,
    CREATE_TICKETS_TABLE_SQL,
    CREATE_TICKETS_CUSTOMER_INDEX_SQL,
];
