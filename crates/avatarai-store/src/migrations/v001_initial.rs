//! v001 -- Initial schema creation.
//!
//! Creates `local_storage` and `cookies`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Key/value store
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS local_storage (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL                 -- RFC-3339
);

-- ----------------------------------------------------------------
-- Cookies
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cookies (
    name       TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    expires_at TEXT                          -- RFC-3339, NULL = session cookie
);
"#;

/// Apply the v001 migration.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
