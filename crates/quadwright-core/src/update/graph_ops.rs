//! Graph-level operations: CREATE, ADD, COPY, MOVE, CLEAR, DROP.
//!
//! The store has no representation of an empty graph, so a graph exists iff
//! it has statements, and CLEAR and DROP coincide.

use super::{
    CreateGraph, DropGraph, ErrorPolicy, GraphTransfer, UpdateExecutionContext, UpdateKind,
};
use crate::primitives::COPY_CHUNK_SIZE;
use crate::store::StatementPattern;
use crate::{StatementKind, Term, UpdateError};

/// Executes graph-level operations against the context's connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOperationExecutor;

impl GraphOperationExecutor {
    /// CREATE: fail with `GraphExists` if the target already has statements.
    ///
    /// Graphs exist only through their statements, so a SILENT CREATE has
    /// nothing to check and nothing to do.
    pub fn create(
        &self,
        op: &CreateGraph,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<(), UpdateError> {
        if op.policy == ErrorPolicy::Silent {
            return Ok(());
        }

        let target = op.target.resolved().ok_or_else(|| {
            UpdateError::PreconditionViolation("CREATE requires a graph".to_string())
        })?;

        let count = ctx
            .store
            .range_count(&StatementPattern::in_graph(target.clone()), false)?;
        if count > 0 {
            return Err(UpdateError::GraphExists(target.clone()));
        }
        Ok(())
    }

    /// ADD: copy the source statements into the target. Returns the number written.
    pub fn add(
        &self,
        op: &GraphTransfer,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let source = ctx.graph_or_null(&op.source);
        let target = ctx.graph_or_null(&op.target);
        if source == target {
            return Ok(0);
        }
        self.copy_statements(source, target, ctx)
    }

    /// COPY: replace the target with the source.
    pub fn copy(
        &self,
        op: &GraphTransfer,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let (source, target) = Self::both_resolved(op, UpdateKind::Copy)?;
        if source == target {
            return Ok(0);
        }

        self.remove(Some(target), ctx)?;
        self.copy_statements(Some(source.clone()), Some(target.clone()), ctx)
    }

    /// MOVE: replace the target with the source, then clear the source.
    pub fn move_graph(
        &self,
        op: &GraphTransfer,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let (source, target) = Self::both_resolved(op, UpdateKind::Move)?;
        if source == target {
            return Ok(0);
        }

        self.remove(Some(target), ctx)?;
        let moved = self.copy_statements(Some(source.clone()), Some(target.clone()), ctx)?;
        self.remove(Some(source), ctx)?;
        Ok(moved)
    }

    /// CLEAR. Returns the number of statements removed.
    pub fn clear(
        &self,
        op: &DropGraph,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        self.remove_graph(op, UpdateKind::Clear, ctx)
    }

    /// DROP. Identical to CLEAR.
    pub fn drop_graph(
        &self,
        op: &DropGraph,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        self.remove_graph(op, UpdateKind::Drop, ctx)
    }

    fn remove_graph(
        &self,
        op: &DropGraph,
        kind: UpdateKind,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        match (op.target.resolved(), op.scope) {
            (Some(target), _) => self.remove(Some(target), ctx),
            (None, Some(scope)) => Err(UpdateError::UnsupportedUpdate(format!(
                "{} {} needs a dataset description",
                kind, scope
            ))),
            (None, None) => self.remove(None, ctx),
        }
    }

    /// Remove one context, or everything when `context` is `None`.
    fn remove(
        &self,
        context: Option<&Term>,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let pattern = match context {
            Some(c) => StatementPattern::in_graph(c.clone()),
            None => StatementPattern::any(),
        };
        ctx.store.remove_statements(&pattern)
    }

    /// Stream `source` into `target` in chunks of `COPY_CHUNK_SIZE`.
    fn copy_statements(
        &self,
        source: Option<Term>,
        target: Option<Term>,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let pattern = StatementPattern {
            context: source,
            ..StatementPattern::any()
        };
        let cursor = ctx.store.get_statements(&pattern, ctx.include_inferred)?;

        let mut written = 0;
        let mut chunk = Vec::with_capacity(COPY_CHUNK_SIZE);
        for statement in cursor {
            chunk.push(statement?.with_context(target.clone()));
            if chunk.len() == COPY_CHUNK_SIZE {
                written += ctx.store.add_statements(&chunk, StatementKind::Explicit)?;
                chunk.clear();
            }
        }
        if !chunk.is_empty() {
            written += ctx.store.add_statements(&chunk, StatementKind::Explicit)?;
        }
        Ok(written)
    }

    fn both_resolved(
        op: &GraphTransfer,
        kind: UpdateKind,
    ) -> Result<(&Term, &Term), UpdateError> {
        match (op.source.resolved(), op.target.resolved()) {
            (Some(source), Some(target)) => Ok((source, target)),
            _ => Err(UpdateError::PreconditionViolation(format!(
                "{} requires resolved source and target, got {} and {}",
                kind, op.source, op.target
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::Statement;
    use crate::store::{MemoryStore, QuadStore};
    use crate::update::{GraphRef, GraphScope, UpdateOperation, UpdateOperation as Op};
    use std::collections::BTreeSet;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn quad(s: &str, g: &str) -> Statement {
        Statement::quad(ex(s), ex("p"), ex("o"), ex(g))
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::quads();
        store
            .add_statements(
                &[quad("a", "src"), quad("b", "src"), quad("c", "dst")],
                StatementKind::Explicit,
            )
            .expect("seed");
        store
    }

    fn subjects(store: &MemoryStore, g: &str) -> BTreeSet<Term> {
        store.graph(&ex(g)).into_iter().map(|s| s.subject).collect()
    }

    fn transfer(op: UpdateOperation) -> GraphTransfer {
        match op {
            Op::Add(t) | Op::Copy(t) | Op::Move(t) => t,
            other => panic!("not a transfer: {:?}", other),
        }
    }

    fn drop_payload(op: UpdateOperation) -> DropGraph {
        match op {
            Op::Clear(d) | Op::Drop(d) => d,
            other => panic!("not a drop: {:?}", other),
        }
    }

    #[test]
    fn create_rejects_existing_graph() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);
        let exec = GraphOperationExecutor;

        let existing = CreateGraph {
            target: GraphRef::named(ex("src")),
            ..CreateGraph::default()
        };
        assert!(matches!(
            exec.create(&existing, &ctx),
            Err(UpdateError::GraphExists(_))
        ));

        let fresh = CreateGraph {
            target: GraphRef::named(ex("new")),
            ..CreateGraph::default()
        };
        exec.create(&fresh, &ctx).expect("create new graph");
        assert_eq!(store.statement_count().expect("count"), 3);
    }

    #[test]
    fn create_requires_target() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);
        assert!(matches!(
            GraphOperationExecutor.create(&CreateGraph::default(), &ctx),
            Err(UpdateError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn silent_create_skips_every_check() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);
        let silent = |target: GraphRef| CreateGraph {
            target,
            policy: ErrorPolicy::Silent,
        };

        GraphOperationExecutor
            .create(&silent(GraphRef::unresolved()), &ctx)
            .expect("silent create without target");
        GraphOperationExecutor
            .create(&silent(GraphRef::named(ex("src"))), &ctx)
            .expect("silent create on existing graph");
        assert_eq!(store.statement_count().expect("count"), 3);
    }

    #[test]
    fn add_unions_into_target() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        let written = GraphOperationExecutor
            .add(&transfer(Op::add(ex("src"), ex("dst"))), &ctx)
            .expect("add");

        assert_eq!(written, 2);
        assert_eq!(subjects(&store, "dst"), [ex("a"), ex("b"), ex("c")].into());
        assert_eq!(subjects(&store, "src"), [ex("a"), ex("b")].into());
    }

    #[test]
    fn add_from_default_graph_reads_null_graph() {
        let store = MemoryStore::quads();
        store
            .add_statement(&Statement::quad(ex("a"), ex("p"), ex("o"), Term::null_graph()))
            .expect("seed");
        let ctx = UpdateExecutionContext::new(&store);

        GraphOperationExecutor
            .add(&transfer(Op::add(GraphRef::unresolved(), ex("dst"))), &ctx)
            .expect("add");
        assert_eq!(subjects(&store, "dst"), [ex("a")].into());
    }

    #[test]
    fn copy_replaces_target() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        GraphOperationExecutor
            .copy(&transfer(Op::copy(ex("src"), ex("dst"))), &ctx)
            .expect("copy");

        assert_eq!(subjects(&store, "dst"), [ex("a"), ex("b")].into());
        assert_eq!(subjects(&store, "src"), [ex("a"), ex("b")].into());
    }

    #[test]
    fn copy_requires_resolved_graphs_before_mutating() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        let result = GraphOperationExecutor.copy(
            &transfer(Op::copy(GraphRef::unresolved(), ex("dst"))),
            &ctx,
        );
        assert!(matches!(result, Err(UpdateError::PreconditionViolation(_))));
        assert_eq!(subjects(&store, "dst"), [ex("c")].into());
    }

    #[test]
    fn move_empties_source() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        let moved = GraphOperationExecutor
            .move_graph(&transfer(Op::move_graph(ex("src"), ex("dst"))), &ctx)
            .expect("move");

        assert_eq!(moved, 2);
        assert_eq!(subjects(&store, "dst"), [ex("a"), ex("b")].into());
        assert!(store.graph(&ex("src")).is_empty());
    }

    #[test]
    fn move_onto_itself_keeps_data() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        GraphOperationExecutor
            .move_graph(&transfer(Op::move_graph(ex("src"), ex("src"))), &ctx)
            .expect("move");
        assert_eq!(subjects(&store, "src"), [ex("a"), ex("b")].into());
    }

    #[test]
    fn clear_graph_and_all() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        let removed = GraphOperationExecutor
            .clear(&drop_payload(Op::clear(ex("src"))), &ctx)
            .expect("clear");
        assert_eq!(removed, 2);
        assert_eq!(store.statement_count().expect("count"), 1);

        GraphOperationExecutor
            .drop_graph(&drop_payload(Op::clear_all()), &ctx)
            .expect("drop all");
        assert_eq!(store.statement_count().expect("count"), 0);
    }

    #[test]
    fn scoped_clear_is_unsupported() {
        let store = seeded();
        let ctx = UpdateExecutionContext::new(&store);

        let result = GraphOperationExecutor.clear(
            &drop_payload(Op::clear_scope(GraphScope::NamedGraphs)),
            &ctx,
        );
        assert!(matches!(result, Err(UpdateError::UnsupportedUpdate(_))));
        assert_eq!(store.statement_count().expect("count"), 3);
    }
}
