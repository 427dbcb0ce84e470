//! Builder (C4) — materialises one OR-branch's result rows into `RDS`.
//!
//! Given an already-inserted `rds_id` and the [`Branch`] it identifies,
//! [`Builder::build`] runs four phases:
//!
//! 1. **Register** — the caller has already inserted the catalog row and
//!    holds `rds_id` (this module never touches `RDS_catalog`).
//! 2. **Seed** from the first AND-node: insert every `(rds_id, inode,
//!    objectname)` matching the primary OR any of its `related` nodes.
//! 3. **Intersect** with each subsequent AND-node: delete rows whose inode
//!    does not match that node (or its `related` chain).
//! 4. **Subtract negations** — for every AND-node (including the first)
//!    and every node in its `negated` chain, delete rows whose inode
//!    matches.
//!
//! An empty branch (no AND-nodes) skips Phase 2 entirely, leaving the
//! catalog entry present but the `RDS` rows empty — future identical
//! queries are still short-circuited by the catalog.
//!
//! Every value interpolation goes through `rusqlite` bound parameters.
//! Only predicate *structure* — which operator, how many `OR` clauses — is
//! assembled textually.
//!
//! `related` nodes broaden Phase 2/3 matching but are not part of the
//! fingerprint (`crate::fingerprint`); if the reasoner's notion of
//! "related" changes over time, already-materialised rows can go stale
//! without the fingerprint changing. There is no mitigation for this here.

use rusqlite::{types::Value as SqlValue, Connection};

use crate::error::RdsError;
use crate::query::{AndNode, Branch, Op, Predicate};

/// Namespace for the materialisation phases. Holds no state.
pub struct Builder;

impl Builder {
    /// Materialise `branch` under `rds_id`. Idempotent in the sense that
    /// running it twice on an already-populated `rds_id` with the same
    /// branch produces the same final row set (Phase 3/4 are pure
    /// deletes), though callers should not normally rebuild into a
    /// non-empty id — see `Catalog::fetch_id`'s rebuild path, which drops
    /// `RDS` rows before re-inserting.
    pub fn build(conn: &Connection, rds_id: i64, branch: &Branch) -> Result<(), RdsError> {
        let Some(first) = branch.first_and() else {
            return Ok(());
        };

        Self::seed(conn, rds_id, first)?;
        for node in branch.next_and() {
            Self::intersect(conn, rds_id, node)?;
        }
        for node in branch.and_nodes() {
            for negated in node.negated_chain() {
                Self::subtract(conn, rds_id, negated)?;
            }
        }
        Ok(())
    }

    /// Phase 2 — seed the result set from the first AND-node.
    fn seed(conn: &Connection, rds_id: i64, node: &AndNode) -> Result<(), RdsError> {
        let (predicate_sql, mut values) = disjunctive_predicate(node);
        let sql = format!(
            "INSERT INTO RDS (rds_id, inode, objectname) \
             SELECT DISTINCT ?, objects.inode, objects.objectname \
             FROM objects \
             JOIN tagging ON tagging.inode = objects.inode \
             JOIN tags ON tags.tag_id = tagging.tag_id \
             WHERE {predicate_sql}"
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::Integer(rds_id)];
        params.append(&mut values);
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(())
    }

    /// Phase 3 — restrict the result set to rows also matching `node`.
    fn intersect(conn: &Connection, rds_id: i64, node: &AndNode) -> Result<(), RdsError> {
        let (predicate_sql, mut values) = disjunctive_predicate(node);
        let sql = format!(
            "DELETE FROM RDS WHERE rds_id = ? AND inode NOT IN ( \
                SELECT objects.inode FROM objects \
                JOIN tagging ON tagging.inode = objects.inode \
                JOIN tags ON tags.tag_id = tagging.tag_id \
                WHERE {predicate_sql} \
             )"
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::Integer(rds_id)];
        params.append(&mut values);
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(())
    }

    /// Phase 4 — subtract rows matching a negated node.
    fn subtract(conn: &Connection, rds_id: i64, node: &AndNode) -> Result<(), RdsError> {
        let (predicate_sql, mut values) = disjunctive_predicate(node);
        let sql = format!(
            "DELETE FROM RDS WHERE rds_id = ? AND inode IN ( \
                SELECT objects.inode FROM objects \
                JOIN tagging ON tagging.inode = objects.inode \
                JOIN tags ON tags.tag_id = tagging.tag_id \
                WHERE {predicate_sql} \
             )"
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::Integer(rds_id)];
        params.append(&mut values);
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(())
    }
}

/// Build the `OR`-ed predicate for one AND-node's primary plus its
/// `related` chain, along with the bound
/// parameter values in the order their placeholders appear.
fn disjunctive_predicate(node: &AndNode) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::with_capacity(1 + node.related_chain().len());
    let mut values = Vec::new();
    for candidate in std::iter::once(node).chain(node.related_chain().iter()) {
        let (clause, mut clause_values) = single_predicate(&candidate.predicate);
        clauses.push(clause);
        values.append(&mut clause_values);
    }
    (format!("({})", clauses.join(" OR ")), values)
}

/// The predicate for a single node's own primary (no related expansion).
fn single_predicate(predicate: &Predicate) -> (String, Vec<SqlValue>) {
    match predicate {
        Predicate::Tag {
            tag_id: Some(id), ..
        } => (
            "tagging.tag_id = ?".to_string(),
            vec![SqlValue::Integer(*id)],
        ),
        Predicate::Tag { name, tag_id: None } => (
            "tags.tagname = ?".to_string(),
            vec![SqlValue::Text(name.clone())],
        ),
        Predicate::Triple {
            namespace,
            key,
            op,
            value,
        } => {
            let ns = SqlValue::Text(namespace.clone());
            let k = SqlValue::Text(key.clone());
            match op {
                Op::Eq => (
                    "(tags.namespace = ? AND tags.key = ? AND tags.value = ?)".to_string(),
                    vec![ns, k, SqlValue::Text(value.clone())],
                ),
                Op::Contains => (
                    "(tags.namespace = ? AND tags.key = ? AND tags.value LIKE ?)".to_string(),
                    vec![ns, k, SqlValue::Text(format!("%{value}%"))],
                ),
                // Numeric comparison: tag values are stored as text, so a
                // plain `>`/`<` would compare lexicographically ("100" <
                // "50"). Cast both sides to REAL to get the numeric
                // ordering the GT/LT operators are meant to express.
                Op::Gt => (
                    "(tags.namespace = ? AND tags.key = ? AND \
                      CAST(tags.value AS REAL) > CAST(? AS REAL))"
                        .to_string(),
                    vec![ns, k, SqlValue::Text(value.clone())],
                ),
                Op::Lt => (
                    "(tags.namespace = ? AND tags.key = ? AND \
                      CAST(tags.value AS REAL) < CAST(? AS REAL))"
                        .to_string(),
                    vec![ns, k, SqlValue::Text(value.clone())],
                ),
            }
        }
    }
}
