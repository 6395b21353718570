//! SQL DDL for the SQLite document store.

/// SQLite schema with:
/// - `seq` INTEGER PRIMARY KEY AUTOINCREMENT, giving listings insertion order
/// - `id` generated ObjectId hex, UNIQUE
/// - `collection` name, indexed since every query filters on it
/// - `body` the record as JSON text (without `_id`)
/// - `created_at` / `updated_at` RFC3339
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    collection TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id);
"#;
