//! Query AST (C1) — typed representation of an or-of-ands tag expression.
//!
//! A [`Query`] is a non-empty list of [`Branch`]es (OR-union). Each `Branch`
//! is an ordered conjunction ([`AndNode`]s, AND-chain). Each `AndNode` names
//! either a plain tag or a namespaced triple, and carries two auxiliary
//! chains: `related` (reasoner-provided broadeners, OR-unioned with the
//! primary) and `negated` (subtracted from the result).
//!
//! Iteration order within a branch is load-bearing: the [`Builder`](crate::builder)
//! seeds the result set from the *first* AND-node and intersects with the
//! rest, so `Branch` preserves insertion order rather than, say, sorting
//! nodes by predicate kind.

use std::fmt;

/// A comparison operator for a namespaced tag triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Contains,
    Gt,
    Lt,
}

impl Op {
    /// The wire/subquery-text code for this operator.
    pub fn code(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Contains => "inc",
            Op::Gt => "gt",
            Op::Lt => "lt",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The predicate carried by one [`AndNode`]: either a plain tag (optionally
/// already resolved to a `tag_id`) or a namespaced triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// A plain tag name, with an optional pre-resolved `tag_id`.
    Tag { name: String, tag_id: Option<i64> },
    /// A `(namespace, key, op, value)` triple.
    Triple {
        namespace: String,
        key: String,
        op: Op,
        value: String,
    },
}

impl Predicate {
    pub fn tag(name: impl Into<String>) -> Self {
        Predicate::Tag {
            name: name.into(),
            tag_id: None,
        }
    }

    pub fn tag_with_id(name: impl Into<String>, tag_id: i64) -> Self {
        Predicate::Tag {
            name: name.into(),
            tag_id: Some(tag_id),
        }
    }

    pub fn triple(
        namespace: impl Into<String>,
        key: impl Into<String>,
        op: Op,
        value: impl Into<String>,
    ) -> Self {
        Predicate::Triple {
            namespace: namespace.into(),
            key: key.into(),
            op,
            value: value.into(),
        }
    }
}

/// One atomic predicate over the tag tables, plus its related and negated
/// chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndNode {
    pub predicate: Predicate,
    /// Reasoner-provided broadeners, disjunctively equivalent to `predicate`.
    pub related: Vec<AndNode>,
    /// Nodes whose matching inodes are subtracted from the result.
    pub negated: Vec<AndNode>,
}

impl AndNode {
    pub fn new(predicate: Predicate) -> Self {
        AndNode {
            predicate,
            related: Vec::new(),
            negated: Vec::new(),
        }
    }

    pub fn with_related(mut self, related: Vec<AndNode>) -> Self {
        self.related = related;
        self
    }

    pub fn with_negated(mut self, negated: Vec<AndNode>) -> Self {
        self.negated = negated;
        self
    }

    /// The reasoner-expanded chain disjunctively equivalent to this node.
    /// Excludes `self` — the caller ORs this together with the primary.
    pub fn related_chain(&self) -> &[AndNode] {
        &self.related
    }

    /// Nodes whose matches are subtracted for this primary.
    pub fn negated_chain(&self) -> &[AndNode] {
        &self.negated
    }
}

/// One OR-branch: a conjunction of [`AndNode`]s, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    and_nodes: Vec<AndNode>,
}

impl Branch {
    pub fn new(and_nodes: Vec<AndNode>) -> Self {
        Branch { and_nodes }
    }

    pub fn empty() -> Self {
        Branch {
            and_nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: AndNode) {
        self.and_nodes.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.and_nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.and_nodes.len()
    }

    /// The seeding AND-node (Phase 2 of the Builder), or `None` for an
    /// empty branch.
    pub fn first_and(&self) -> Option<&AndNode> {
        self.and_nodes.first()
    }

    /// The restricting AND-nodes after the first (Phase 3 of the Builder).
    pub fn next_and(&self) -> &[AndNode] {
        if self.and_nodes.is_empty() {
            &[]
        } else {
            &self.and_nodes[1..]
        }
    }

    /// All AND-nodes in source order, including the first.
    pub fn and_nodes(&self) -> &[AndNode] {
        &self.and_nodes
    }
}

/// The whole query: a non-empty union of OR-branches.
#[derive(Debug, Clone)]
pub struct Query {
    branches: Vec<Branch>,
}

impl Query {
    /// Build a query from its OR-branches. Returns `None` for an empty
    /// branch list — callers should surface this as
    /// [`RdsError::MalformedQuery`](crate::error::RdsError::MalformedQuery).
    pub fn new(branches: Vec<Branch>) -> Option<Self> {
        if branches.is_empty() {
            None
        } else {
            Some(Query { branches })
        }
    }

    /// A single-branch query, the common case for a plain conjunction.
    pub fn single(branch: Branch) -> Self {
        Query {
            branches: vec![branch],
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Iterate the OR-branches in source order, as an iterator rather
    /// than a cursor.
    pub fn next_branch(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }
}
