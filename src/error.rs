//! Error types for the RDS cache.
//!
//! All errors that can occur while preparing, loading, or invalidating a
//! cached query are represented by [`RdsError`]. Errors are propagated via
//! `Result<T, RdsError>` throughout the crate.
//!
//! # Error Classification
//!
//! - **MalformedQuery** — the caller handed us a query AST that cannot be
//!   fingerprinted (no branches). Never retried; the caller should treat
//!   it as an empty result.
//! - **Db** — the underlying SQL driver returned an error. Mutation
//!   operations (`prepare`, `invalidate`) propagate it; read operations
//!   (`load`, `contains`) degrade to an empty result and log it.
//! - **CatalogConflict** — a duplicate-insert race on `subquery` despite the
//!   build mutex (e.g. another process sharing the same database file).
//!   The caller should retry `fetch_id`.
//! - **ExpiredRace** — `load` observed zero rows because a concurrent
//!   `invalidate` + rebuild deleted them out from under a read. Acceptable;
//!   surfaces as "not found."

use std::fmt;

/// Primary error type for the RDS cache.
#[derive(Debug, thiserror::Error)]
pub enum RdsError {
    /// The query AST was empty or otherwise could not be canonicalised.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// The underlying SQL driver returned an error.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// A duplicate-insert race on `subquery_text` was detected despite the
    /// build mutex.
    #[error("catalog conflict inserting subquery {subquery:?}: {source}")]
    CatalogConflict {
        subquery: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A concurrent invalidation removed rows out from under a read.
    #[error("expired race reading fingerprint {0:?}")]
    ExpiredRace(String),
}

impl RdsError {
    /// Whether a read operation (`load`, `contains`) should degrade this
    /// error to an empty result rather than propagate it to the caller.
    ///
    /// Mutation operations (`prepare`, `invalidate`) never consult this —
    /// they always propagate.
    pub fn is_read_degradable(&self) -> bool {
        matches!(
            self,
            RdsError::ExpiredRace(_) | RdsError::CatalogConflict { .. }
        )
    }

    /// Whether `fetch_id` should simply be retried after this error (i.e.
    /// another writer won the race to insert the same subquery text).
    pub fn should_retry_fetch(&self) -> bool {
        matches!(self, RdsError::CatalogConflict { .. })
    }

    /// Coarse classification, mirrored for monitoring/logging call sites.
    pub fn kind(&self) -> RdsErrorKind {
        match self {
            RdsError::MalformedQuery(_) => RdsErrorKind::User,
            RdsError::Db(_) => RdsErrorKind::System,
            RdsError::CatalogConflict { .. } => RdsErrorKind::System,
            RdsError::ExpiredRace(_) => RdsErrorKind::Transient,
        }
    }
}

/// Classification of error severity for monitoring/logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdsErrorKind {
    /// Caller handed us something invalid; not retryable.
    User,
    /// Driver/storage layer failure.
    System,
    /// Expected under concurrent mutation; surfaces as "not found."
    Transient,
}

impl fmt::Display for RdsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdsErrorKind::User => write!(f, "USER"),
            RdsErrorKind::System => write!(f, "SYSTEM"),
            RdsErrorKind::Transient => write!(f, "TRANSIENT"),
        }
    }
}
