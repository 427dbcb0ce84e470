//! Subquery serialiser (C2) and the whole-query [`Fingerprint`] type.
//!
//! [`canonical_text`] produces the canonical identity string for one
//! OR-branch, used as the unique key in [`crate::catalog`]. [`Fingerprint`]
//! is the comma-joined list of `rds_id`s that answers a whole [`Query`].

use std::fmt;
use std::str::FromStr;

use crate::query::{AndNode, Branch, Predicate};

/// Canonical text for one OR-branch.
///
/// Algorithm:
/// 1. Emit primary AND-nodes in list order: `"<tag>/"` for a plain tag,
///    `"<namespace>/<key>/<op-code>/<value>/"` for a triple.
/// 2. After all primaries, emit every negated node of every primary
///    (primary order, then its own negated-chain order), each prefixed
///    `"-/"` before its normal encoding.
/// 3. Related nodes are never encoded — they are assumed to be a purely
///    expansive property of the primary tag and must not cause cache
///    misses for logically equivalent queries.
///
/// Two branches that produce equal strings MUST produce equal result sets;
/// canonicalisation is deterministic but **order-sensitive**: two queries
/// whose AND-lists are permutations of each other yield different text
/// unless the source order already matches — the conservative behaviour
/// is kept here.
pub fn canonical_text(branch: &Branch) -> String {
    let mut out = String::new();
    for node in branch.and_nodes() {
        encode_node(&mut out, node);
    }
    for node in branch.and_nodes() {
        for negated in node.negated_chain() {
            out.push_str("-/");
            encode_node(&mut out, negated);
        }
    }
    out
}

fn encode_node(out: &mut String, node: &AndNode) {
    match &node.predicate {
        Predicate::Tag { name, .. } => {
            out.push_str(name);
            out.push('/');
        }
        Predicate::Triple {
            namespace,
            key,
            op,
            value,
        } => {
            out.push_str(namespace);
            out.push('/');
            out.push_str(key);
            out.push('/');
            out.push_str(op.code());
            out.push('/');
            out.push_str(value);
            out.push('/');
        }
    }
}

/// The comma-joined list of `rds_id`s that answers a whole query
/// (`id(,id)*`, no surrounding whitespace).
///
/// A `None` fingerprint (absent from the type entirely — callers hold
/// `Option<Fingerprint>`) means "ALL objects": the empty fingerprint is
/// represented as a null value, not an empty `Fingerprint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(Vec<i64>);

impl Fingerprint {
    /// Build a fingerprint from per-branch rds_ids, in branch order.
    /// Empty input is rejected — an empty query has no fingerprint at all
    /// (represented as `None` by the caller), not a `Fingerprint` wrapping
    /// zero ids.
    pub fn new(ids: Vec<i64>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Fingerprint(ids))
        }
    }

    pub fn ids(&self) -> &[i64] {
        &self.0
    }

    /// Set-equality, ignoring order — used by the idempotence property:
    /// two `prepare` calls on the same query must agree on the *set* of
    /// ids even if branch build order differed.
    pub fn set_eq(&self, other: &Fingerprint) -> bool {
        let mut a = self.0.clone();
        let mut b = other.0.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(i64::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Error returned when parsing a fingerprint string fails.
#[derive(Debug, thiserror::Error)]
#[error("invalid fingerprint syntax: {0:?}")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseFingerprintError(s.to_string()));
        }
        let mut ids = Vec::new();
        for part in s.split(',') {
            let id: i64 = part
                .parse()
                .map_err(|_| ParseFingerprintError(s.to_string()))?;
            ids.push(id);
        }
        Ok(Fingerprint(ids))
    }
}
