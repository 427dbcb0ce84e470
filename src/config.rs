//! Runtime configuration (C8, ambient).
//!
//! This crate is a plain library with a caller-owned connection, so its
//! configuration is a plain struct the embedder builds and passes in,
//! rather than a process-wide registry the library owns.

/// Tunables for [`crate::coordinator::Coordinator`] behaviour.
///
/// None of these fields change the on-disk schema or the canonicalisation
/// algorithm — both are fixed — only how eagerly the coordinator treats
/// cached rows as stale.
#[derive(Debug, Clone, PartialEq)]
pub struct RdsConfig {
    /// Default value for `rebuild_expired` when a caller does not specify
    /// one explicitly. `false` serves a flagged-expired row until the
    /// caller opts into a rebuild.
    pub rebuild_expired_by_default: bool,

    /// Whether [`crate::catalog::Catalog::invalidate_by_tag`] may be
    /// called by higher-level code paths at all, or only
    /// [`crate::catalog::Catalog::mark_expired`] (via
    /// [`crate::coordinator::Coordinator::invalidate`]). Disabled by
    /// default — eager tag-targeted eviction is exposed but not the
    /// default policy.
    pub enable_invalidate_by_tag: bool,

    /// Upper bound on one branch's canonical subquery text length, or
    /// `None` for no limit. A query whose canonicalisation exceeds this
    /// is rejected as [`crate::error::RdsError::MalformedQuery`] before
    /// it ever reaches the catalog — a guard against pathologically deep
    /// AND/negation chains rather than a protocol-mandated limit.
    pub max_subquery_text_len: Option<usize>,
}

impl Default for RdsConfig {
    fn default() -> Self {
        RdsConfig {
            rebuild_expired_by_default: false,
            enable_invalidate_by_tag: false,
            max_subquery_text_len: None,
        }
    }
}

impl RdsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rebuild_expired_by_default(mut self, value: bool) -> Self {
        self.rebuild_expired_by_default = value;
        self
    }

    pub fn with_invalidate_by_tag_enabled(mut self, value: bool) -> Self {
        self.enable_invalidate_by_tag = value;
        self
    }

    pub fn with_max_subquery_text_len(mut self, value: usize) -> Self {
        self.max_subquery_text_len = Some(value);
        self
    }
}
