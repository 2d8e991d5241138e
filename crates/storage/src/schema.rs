use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Ids are 16-byte UUIDs, timestamps the 12-byte big-endian form of
// `Timestamp`, so blob comparison follows creation order.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS projects (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    name TEXT NOT NULL,
    description TEXT,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12)
);

CREATE TABLE IF NOT EXISTS collections (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    project_id BLOB NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12)
);
CREATE INDEX IF NOT EXISTS idx_collections_project ON collections (project_id, created_at);

CREATE TABLE IF NOT EXISTS fields (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    collection_id BLOB NOT NULL REFERENCES collections (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    label TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    sort_order REAL NOT NULL DEFAULT 0,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12),
    UNIQUE (collection_id, name)
);
CREATE INDEX IF NOT EXISTS idx_fields_order ON fields (collection_id, sort_order, created_at);

CREATE TABLE IF NOT EXISTS rows (
    id BLOB PRIMARY KEY CHECK (length(id) = 16),
    collection_id BLOB NOT NULL REFERENCES collections (id) ON DELETE CASCADE,
    data TEXT NOT NULL DEFAULT '{}',
    sort_order REAL NOT NULL DEFAULT 0,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12),
    updated_at BLOB NOT NULL CHECK (length(updated_at) = 12)
);
CREATE INDEX IF NOT EXISTS idx_rows_order ON rows (collection_id, sort_order, created_at);
";
