//! Catalog layer (C3) — CRUD operations over `RDS_catalog` and `RDS`.
//!
//! Stateless CRUD over the two owned tables, one function per operation,
//! each taking the caller-owned connection explicitly, with every value
//! interpolation going through bound parameters, never a string-interpolated
//! value.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::RdsError;

/// Sentinel returned by [`Catalog::fetch_id`] meaning "caller must build."
pub const NOT_FOUND: i64 = 0;

/// Namespace for catalog CRUD. Holds no state — every operation takes the
/// caller-owned connection explicitly — lifetime is caller-owned.
pub struct Catalog;

impl Catalog {
    /// Look up the `rds_id` for a subquery's canonical text.
    ///
    /// If `rebuild_expired` is true, this *always* deletes any existing
    /// `(RDS_catalog, RDS)` rows for that text first (regardless of the
    /// `expired` flag) and returns [`NOT_FOUND`] — the caller is expected
    /// to `insert` + rebuild. Otherwise returns the existing id, or
    /// [`NOT_FOUND`] if the subquery has never been prepared.
    pub fn fetch_id(
        conn: &Connection,
        subquery_text: &str,
        rebuild_expired: bool,
    ) -> Result<i64, RdsError> {
        if rebuild_expired {
            // Deleted explicitly rather than relied on `ON DELETE CASCADE`:
            // cascades are per-connection (`PRAGMA foreign_keys`) and the
            // caller may hand us a connection that never set it.
            conn.execute(
                "DELETE FROM RDS WHERE rds_id IN \
                 (SELECT rds_id FROM RDS_catalog WHERE subquery = ?1)",
                params![subquery_text],
            )?;
            conn.execute(
                "DELETE FROM RDS_catalog WHERE subquery = ?1",
                params![subquery_text],
            )?;
            return Ok(NOT_FOUND);
        }

        let id: Option<i64> = conn
            .query_row(
                "SELECT rds_id FROM RDS_catalog WHERE subquery = ?1",
                params![subquery_text],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id.unwrap_or(NOT_FOUND))
    }

    /// Insert a new catalog row for a never-seen subquery. Returns the
    /// generated `rds_id`.
    ///
    /// A [`RdsError::CatalogConflict`] means another writer inserted the
    /// same `subquery_text` despite the build mutex (e.g. a second process
    /// sharing the same database file) — the caller should re-run
    /// `fetch_id` to pick up the existing id rather than treat this as
    /// fatal.
    pub fn insert(conn: &Connection, subquery_text: &str) -> Result<i64, RdsError> {
        conn.execute(
            "INSERT INTO RDS_catalog (subquery) VALUES (?1)",
            params![subquery_text],
        )
        .map_err(|source| {
            if is_unique_violation(&source) {
                RdsError::CatalogConflict {
                    subquery: subquery_text.to_string(),
                    source,
                }
            } else {
                RdsError::Db(source)
            }
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Mark every id in a fingerprint expired. The next `fetch_id` with
    /// `rebuild_expired = true` will drop and rebuild them.
    pub fn mark_expired(conn: &Connection, ids: &[i64]) -> Result<(), RdsError> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("UPDATE RDS_catalog SET expired = 1 WHERE rds_id IN ({placeholders})");
        conn.execute(&sql, params_from_iter(ids.iter()))?;
        Ok(())
    }

    /// Delete catalog entries, and their `RDS` rows via an explicit
    /// two-statement delete (not `ON DELETE CASCADE` — see `fetch_id`'s
    /// rebuild path above for why), whose `subquery` text contains the
    /// given tag signature.
    ///
    /// Present and exposed as an explicit opt-in for eager eviction, but
    /// **not** wired into [`crate::coordinator::Coordinator::invalidate`]
    /// by default — the live path is flag-based expiry via
    /// [`Catalog::mark_expired`]. Callers that want eager, precise
    /// eviction instead of coarse flagging may call this directly.
    pub fn invalidate_by_tag(conn: &Connection, tag_signature: &str) -> Result<usize, RdsError> {
        let pattern = format!("%{tag_signature}%");
        conn.execute(
            "DELETE FROM RDS WHERE rds_id IN \
             (SELECT rds_id FROM RDS_catalog WHERE subquery LIKE ?1)",
            params![pattern],
        )?;
        let n = conn.execute(
            "DELETE FROM RDS_catalog WHERE subquery LIKE ?1",
            params![pattern],
        )?;
        Ok(n)
    }

    /// Whether every id named in `ids` still has a catalog row (an
    /// invariant check useful in tests: "every rds_id in every fingerprint
    /// exists in RDS_catalog").
    pub fn all_ids_exist(conn: &Connection, ids: &[i64]) -> Result<bool, RdsError> {
        for id in ids {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM RDS_catalog WHERE rds_id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                ..
            },
            _,
        )
    )
}
