//! Execution context shared by every executor call of one update sequence.

use super::{GraphRef, UpdateKind};
use crate::primitives::{DEFAULT_LEXICON_NAMESPACE, DEFAULT_NAMESPACE};
use crate::store::QuadStore;
use crate::{Statement, Term};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// The connection and settings an update sequence runs against.
///
/// Built once per sequence and only read by the compiler and executors.
pub struct UpdateExecutionContext<'a> {
    /// The live connection.
    pub store: &'a dyn QuadStore,
    /// Quads or triples mode, taken from the store.
    pub quads: bool,
    /// Snapshot identifier for query evaluation (milliseconds since the epoch).
    pub timestamp: u64,
    pub namespace: String,
    pub lexicon_namespace: String,
    /// Whether graph copies carry inferred statements along.
    pub include_inferred: bool,
    /// Commit is managed outside the compiler.
    pub cluster: bool,
    /// Update kinds this deployment does not implement.
    pub disabled: BTreeSet<UpdateKind>,
}

impl std::fmt::Debug for UpdateExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateExecutionContext")
            .field("quads", &self.quads)
            .field("timestamp", &self.timestamp)
            .field("namespace", &self.namespace)
            .field("lexicon_namespace", &self.lexicon_namespace)
            .field("include_inferred", &self.include_inferred)
            .field("cluster", &self.cluster)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl<'a> UpdateExecutionContext<'a> {
    /// A context with default settings, stamped now.
    pub fn new(store: &'a dyn QuadStore) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        Self {
            store,
            quads: store.is_quads(),
            timestamp,
            namespace: DEFAULT_NAMESPACE.to_string(),
            lexicon_namespace: DEFAULT_LEXICON_NAMESPACE.to_string(),
            include_inferred: true,
            cluster: false,
            disabled: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
        lexicon_namespace: impl Into<String>,
    ) -> Self {
        self.namespace = namespace.into();
        self.lexicon_namespace = lexicon_namespace.into();
        self
    }

    #[must_use]
    pub fn clustered(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }

    #[must_use]
    pub fn include_inferred(mut self, include: bool) -> Self {
        self.include_inferred = include;
        self
    }

    #[must_use]
    pub fn disable(mut self, kinds: impl IntoIterator<Item = UpdateKind>) -> Self {
        self.disabled.extend(kinds);
        self
    }

    /// The context a graph reference addresses in this mode.
    ///
    /// Triples mode has no contexts. In quads mode an unresolved reference
    /// addresses the null graph.
    #[must_use]
    pub fn graph_or_null(&self, graph: &GraphRef) -> Option<Term> {
        if !self.quads {
            return None;
        }
        Some(graph.resolved().cloned().unwrap_or_else(Term::null_graph))
    }

    /// Fit a statement to the store mode before writing it.
    ///
    /// Quads mode binds the null graph when the statement has no context.
    /// Triples mode drops the context.
    #[must_use]
    pub fn normalize(&self, statement: Statement) -> Statement {
        if self.quads && statement.context.is_none() {
            return statement.with_context(Some(Term::null_graph()));
        }
        statement.contextualize(self.quads, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    #[test]
    fn mode_follows_store() {
        let quads = MemoryStore::quads();
        let triples = MemoryStore::triples();
        assert!(UpdateExecutionContext::new(&quads).quads);
        assert!(!UpdateExecutionContext::new(&triples).quads);
    }

    #[test]
    fn normalize_binds_null_graph_in_quads_mode() {
        let store = MemoryStore::quads();
        let ctx = UpdateExecutionContext::new(&store);

        let bare = Statement::triple(ex("s"), ex("p"), ex("o"));
        assert_eq!(ctx.normalize(bare).context, Some(Term::null_graph()));

        let scoped = Statement::quad(ex("s"), ex("p"), ex("o"), ex("g"));
        assert_eq!(ctx.normalize(scoped).context, Some(ex("g")));
    }

    #[test]
    fn normalize_strips_context_in_triples_mode() {
        let store = MemoryStore::triples();
        let ctx = UpdateExecutionContext::new(&store);
        let scoped = Statement::quad(ex("s"), ex("p"), ex("o"), ex("g"));
        assert_eq!(ctx.normalize(scoped).context, None);
    }

    #[test]
    fn graph_or_null() {
        let store = MemoryStore::quads();
        let ctx = UpdateExecutionContext::new(&store);
        assert_eq!(
            ctx.graph_or_null(&GraphRef::unresolved()),
            Some(Term::null_graph())
        );
        assert_eq!(ctx.graph_or_null(&GraphRef::named(ex("g"))), Some(ex("g")));
    }
}
