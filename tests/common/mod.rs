//! Shared test helpers for integration tests.
//!
//! Tests spin up an on-disk SQLite database under a `tempfile::TempDir`
//! (needed so multiple `rusqlite::Connection`s can observe each other's
//! writes, which an in-memory connection cannot).

use rds_cache::schema;
use rusqlite::Connection;
use tempfile::TempDir;

/// Install a `tracing` subscriber once per test binary, respecting
/// `RUST_LOG`. Lets `cargo test -- --nocapture` surface the warnings the
/// coordinator logs when it degrades a read to an empty result.
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An on-disk SQLite database with the RDS catalog and the minimal
/// `objects`/`tagging`/`tags` stand-ins pre-created. The `TempDir` is
/// kept alive for the struct's lifetime so the backing file survives as
/// long as the test does.
#[allow(dead_code)]
pub struct TestDb {
    _dir: TempDir,
    path: std::path::PathBuf,
}

#[allow(dead_code)]
impl TestDb {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("create tempdir for test database");
        let path = dir.path().join("rds_test.db");
        let conn = Connection::open(&path).expect("open test database");
        // WAL lets readers and the writer proceed concurrently instead of
        // blocking on SQLite's default rollback-journal file lock.
        conn.pragma_update(None, "journal_mode", "WAL")
            .expect("enable WAL mode");
        schema::init_catalog_tables(&conn).expect("init catalog tables");
        schema::init_consumed_tables_for_test(&conn).expect("init consumed tables");
        TestDb { _dir: dir, path }
    }

    /// Open a fresh connection to the same backing file. Use one
    /// connection per thread in concurrency tests — `rusqlite::Connection`
    /// is not `Sync`.
    pub fn connect(&self) -> Connection {
        let conn =
            Connection::open(&self.path).expect("open additional connection to test database");
        // Multiple connections to the same file contend for SQLite's
        // file lock; give concurrency tests room to retry instead of
        // surfacing a spurious `SQLITE_BUSY`.
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .expect("set busy timeout");
        conn
    }

    pub fn seed_tags(&self, conn: &Connection, sql: &str) {
        conn.execute_batch(sql).expect("seed test tag data");
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}
