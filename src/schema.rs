//! SQL schema bootstrap (C6).
//!
//! Owns the DDL for the two tables this crate is responsible for
//! (`RDS_catalog`, `RDS`). The `objects`/`tagging`/`tags` tables are
//! consumed, not owned — they belong to the external tag/object
//! bookkeeping layer — but [`init_consumed_tables_for_test`]
//! creates minimal stand-ins so this crate's own test suite does not need a
//! live embedding filesystem.

use rusqlite::Connection;

use crate::error::RdsError;

/// DDL for the tables this crate owns.
pub const CATALOG_DDL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS RDS_catalog (
    rds_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    creation    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    subquery    TEXT NOT NULL UNIQUE,
    expired     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS RDS (
    rds_id      INTEGER NOT NULL REFERENCES RDS_catalog(rds_id) ON DELETE CASCADE,
    inode       INTEGER NOT NULL,
    objectname  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rds_rds_id ON RDS (rds_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_rds_dedup ON RDS (rds_id, inode);
"#;

/// Minimal DDL for the tables this crate only ever reads, for standalone
/// testing. Production deployments own these via the tag/object
/// bookkeeping layer and must not call this function.
pub const CONSUMED_TABLES_DDL_FOR_TEST: &str = r#"
CREATE TABLE IF NOT EXISTS objects (
    inode       INTEGER PRIMARY KEY,
    objectname  TEXT NOT NULL
);

-- A tag row is either a plain tag (`tagname` set, triple columns NULL) or
-- a namespaced triple (`tagname` NULL, the other three set).
CREATE TABLE IF NOT EXISTS tags (
    tag_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    tagname     TEXT,
    namespace   TEXT,
    key         TEXT,
    value       TEXT
);

CREATE TABLE IF NOT EXISTS tagging (
    inode   INTEGER NOT NULL REFERENCES objects(inode),
    tag_id  INTEGER NOT NULL REFERENCES tags(tag_id),
    PRIMARY KEY (inode, tag_id)
);
"#;

/// Create `RDS_catalog` and `RDS` if they do not already exist. Idempotent;
/// safe to call on every process start.
pub fn init_catalog_tables(conn: &Connection) -> Result<(), RdsError> {
    conn.execute_batch(CATALOG_DDL)?;
    Ok(())
}

/// Create minimal `objects`/`tagging`/`tags` stand-ins for testing this
/// crate in isolation from the real tag/object bookkeeping layer.
pub fn init_consumed_tables_for_test(conn: &Connection) -> Result<(), RdsError> {
    conn.execute_batch(CONSUMED_TABLES_DDL_FOR_TEST)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_catalog_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_catalog_tables(&conn).unwrap();
        init_catalog_tables(&conn).unwrap();
    }
}
