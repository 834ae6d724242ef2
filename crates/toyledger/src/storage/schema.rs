//! `SQLite` schema definitions for toyledger.
//!
//! The base table matches the layout of the first release so databases it
//! created open unchanged; later columns arrive through migrations.

/// SQL statement to create the records table (version 1 layout).
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS toy_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    month TEXT NOT NULL,
    image_path TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Version 2: day-granularity dates and optional purchase details.
pub const MIGRATE_V2: &str = r"
ALTER TABLE toy_records ADD COLUMN record_date TEXT;
ALTER TABLE toy_records ADD COLUMN name TEXT;
ALTER TABLE toy_records ADD COLUMN amount REAL;
ALTER TABLE toy_records ADD COLUMN note TEXT;
UPDATE toy_records SET record_date = month || '-01' WHERE record_date IS NULL;
CREATE INDEX IF NOT EXISTS idx_toy_records_user ON toy_records(user_id, id DESC);
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_RECORDS_TABLE, CREATE_METADATA_TABLE];
