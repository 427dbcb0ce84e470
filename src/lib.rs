//! Resilient Data Set (RDS) cache.
//!
//! A persistent, query-indexed materialisation cache for tag-boolean
//! queries over a tagged object store. Callers build a [`query::Query`]
//! (an OR-of-ANDs over plain tags and namespaced `(namespace, key, op,
//! value)` triples), hand it to a [`coordinator::Coordinator`] along with
//! a caller-owned [`rusqlite::Connection`], and get back a
//! [`fingerprint::Fingerprint`] identifying the materialised result set.
//!
//! ```no_run
//! use rds_cache::config::RdsConfig;
//! use rds_cache::coordinator::Coordinator;
//! use rds_cache::query::{AndNode, Branch, Predicate, Query};
//! use rds_cache::schema;
//!
//! # fn run(conn: &rusqlite::Connection) -> Result<(), rds_cache::error::RdsError> {
//! schema::init_catalog_tables(conn)?;
//!
//! let _config = RdsConfig::default();
//! let coordinator = Coordinator::new();
//! let query = Query::single(Branch::new(vec![AndNode::new(Predicate::tag("project"))]));
//!
//! // `is_all_path = false` here; passing `true` short-circuits to `None`,
//! // the caller's cue to list every object instead of a materialised set.
//! if let Some(fingerprint) = coordinator.prepare(conn, &query, false, false)? {
//!     let handles = coordinator.load(conn, &fingerprint)?;
//!     for (name, handle) in &handles {
//!         println!("{name}: {} handle(s)", handle.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Scope
//!
//! This crate owns query canonicalisation, SQL materialisation, and the
//! catalog/build lifecycle. It does not parse query strings (that is the
//! querytree parser's job), does not walk FUSE paths, and does not own
//! the `objects`/`tagging`/`tags` tables beyond reading them —
//! [`schema::init_consumed_tables_for_test`] exists only for this crate's
//! own tests.
//!
//! # Concurrency
//!
//! [`coordinator::Coordinator`] serialises concurrent builds of the same
//! subquery within one process via a per-subquery lock.
//! It does not serialise builds of *different* subqueries, and it does
//! not protect against a second process sharing the same database file —
//! that race is handled at the SQL layer via `RDS_catalog.subquery`'s
//! `UNIQUE` constraint, surfaced as [`error::RdsError::CatalogConflict`].

#![deny(unsafe_code)]

pub mod builder;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod query;
pub mod schema;

pub use config::RdsConfig;
pub use coordinator::{Coordinator, Handle};
pub use error::{RdsError, RdsErrorKind};
pub use fingerprint::Fingerprint;
pub use query::{AndNode, Branch, Op, Predicate, Query};
