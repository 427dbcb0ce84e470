//! Coordinator (C5) — the public surface tying query, fingerprint,
//! catalog, and builder together.
//!
//! [`Coordinator::prepare`] is the only mutating entry point: for each
//! OR-branch of a [`Query`] it looks up (or builds) a catalog row under a
//! per-subquery lock, then returns the whole-query [`Fingerprint`].
//! [`Coordinator::load`] and [`Coordinator::contains`] are read-only and
//! degrade to an empty result on accepted races rather than propagate them.
//! [`Coordinator::invalidate`] flags catalog rows expired (the default
//! eviction path) rather than deleting rows inline — the next `prepare`
//! for that subquery rebuilds it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::builder::Builder;
use crate::catalog::{Catalog, NOT_FOUND};
use crate::config::RdsConfig;
use crate::error::RdsError;
use crate::fingerprint::{canonical_text, Fingerprint};
use crate::query::Query;

/// An in-memory handle to one materialised result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub inode: i64,
    pub objectname: String,
}

/// Coordinates query preparation, load, and invalidation.
///
/// Holds a registry of per-subquery locks rather than one global mutex, so
/// unrelated builds never serialise against each other. The lock is keyed
/// on the canonical subquery text, the same granularity as a catalog row,
/// so at-most-one build runs per fingerprint component at a time.
pub struct Coordinator {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: RdsConfig,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_config(RdsConfig::default())
    }

    pub fn with_config(config: RdsConfig) -> Self {
        Coordinator {
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock_for(&self, subquery_text: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("build-lock registry poisoned");
        locks
            .entry(subquery_text.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// [`Coordinator::prepare`] using [`RdsConfig::rebuild_expired_by_default`]
    /// instead of an explicit `rebuild_expired` argument.
    pub fn prepare_default(
        &self,
        conn: &Connection,
        query: &Query,
        is_all_path: bool,
    ) -> Result<Option<Fingerprint>, RdsError> {
        self.prepare(conn, query, is_all_path, self.config.rebuild_expired_by_default)
    }

    /// Resolve every branch of `query` to a catalog row, building whichever
    /// ones are missing (or flagged expired, when `rebuild_expired` is
    /// set), and return the whole-query fingerprint.
    ///
    /// If `is_all_path` is set, short-circuits to `Ok(None)` without
    /// touching the catalog at all — a `None` fingerprint means "ALL
    /// objects," the caller's cue to skip the materialised cache entirely
    /// rather than look up an empty id list.
    ///
    /// Mutation errors always propagate — `prepare` never silently
    /// degrades.
    pub fn prepare(
        &self,
        conn: &Connection,
        query: &Query,
        is_all_path: bool,
        rebuild_expired: bool,
    ) -> Result<Option<Fingerprint>, RdsError> {
        if is_all_path {
            return Ok(None);
        }

        let mut ids = Vec::with_capacity(query.branches().len());

        for branch in query.next_branch() {
            let subquery_text = canonical_text(branch);
            if let Some(max_len) = self.config.max_subquery_text_len {
                if subquery_text.len() > max_len {
                    return Err(RdsError::MalformedQuery(format!(
                        "canonical subquery text of {} bytes exceeds configured maximum of {max_len}",
                        subquery_text.len()
                    )));
                }
            }
            let lock = self.lock_for(&subquery_text);
            let _guard = lock.lock().expect("per-subquery build lock poisoned");

            let mut id = Catalog::fetch_id(conn, &subquery_text, rebuild_expired)?;
            if id == NOT_FOUND {
                id = match Catalog::insert(conn, &subquery_text) {
                    Ok(new_id) => {
                        Builder::build(conn, new_id, branch)?;
                        new_id
                    }
                    // Another writer (a second process sharing this
                    // database file — not another thread, which would
                    // have blocked on `_guard`) won the insert race.
                    // Pick up the id it created; it is responsible for
                    // building its own rows.
                    Err(e) if e.should_retry_fetch() => {
                        Catalog::fetch_id(conn, &subquery_text, false)?
                    }
                    Err(e) => return Err(e),
                };
            }
            ids.push(id);
        }

        let fingerprint = Fingerprint::new(ids)
            .ok_or_else(|| RdsError::MalformedQuery("query produced no branches".to_string()))?;
        Ok(Some(fingerprint))
    }

    /// Load every handle named by `fingerprint`, deduplicated by inode
    /// within each object name.
    ///
    /// Degrades to an empty map on accepted races (`ExpiredRace`,
    /// `CatalogConflict`); other errors propagate.
    pub fn load(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
    ) -> Result<HashMap<String, Vec<Handle>>, RdsError> {
        match self.load_inner(conn, fingerprint) {
            Ok(map) => Ok(map),
            Err(e) if e.is_read_degradable() => {
                tracing::warn!(error = %e, fingerprint = %fingerprint, "load degraded to empty result");
                Ok(HashMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn load_inner(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
    ) -> Result<HashMap<String, Vec<Handle>>, RdsError> {
        let mut result: HashMap<String, Vec<Handle>> = HashMap::new();
        for id in fingerprint.ids() {
            let mut stmt =
                conn.prepare("SELECT inode, objectname FROM RDS WHERE rds_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (inode, objectname) = row?;
                let handles = result.entry(objectname.clone()).or_default();
                if !handles.iter().any(|h: &Handle| h.inode == inode) {
                    handles.push(Handle { inode, objectname });
                }
            }
        }
        Ok(result)
    }

    /// Whether `objectname` is present under `fingerprint`, returning its
    /// inode if so. When the caller already knows the candidate `inode`
    /// (the qtree carries one), pass it to qualify the membership test on
    /// both columns instead of `objectname` alone. Degrades like
    /// [`Coordinator::load`].
    pub fn contains(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
        objectname: &str,
        inode: Option<i64>,
    ) -> Result<Option<i64>, RdsError> {
        match self.contains_inner(conn, fingerprint, objectname, inode) {
            Ok(found) => Ok(found),
            Err(e) if e.is_read_degradable() => {
                tracing::warn!(error = %e, fingerprint = %fingerprint, "contains degraded to not-found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn contains_inner(
        &self,
        conn: &Connection,
        fingerprint: &Fingerprint,
        objectname: &str,
        inode: Option<i64>,
    ) -> Result<Option<i64>, RdsError> {
        for id in fingerprint.ids() {
            let found: Option<i64> = match inode {
                Some(expected_inode) => conn
                    .query_row(
                        "SELECT inode FROM RDS WHERE rds_id = ?1 AND objectname = ?2 AND inode = ?3",
                        params![id, objectname, expected_inode],
                        |row| row.get(0),
                    )
                    .optional()?,
                None => conn
                    .query_row(
                        "SELECT inode FROM RDS WHERE rds_id = ?1 AND objectname = ?2",
                        params![id, objectname],
                        |row| row.get(0),
                    )
                    .optional()?,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Flag every catalog row in `fingerprint` expired. This is the
    /// default eviction path — it does
    /// not delete rows inline, it only marks them for the next `prepare`
    /// with `rebuild_expired = true` to drop and rebuild. Callers who need
    /// eager, tag-targeted eviction instead should call
    /// [`Catalog::invalidate_by_tag`] directly.
    pub fn invalidate(&self, conn: &Connection, fingerprint: &Fingerprint) -> Result<(), RdsError> {
        Catalog::mark_expired(conn, fingerprint.ids())
    }
}
