//! # Property-Based Tests
//!
//! Graph algebra and buffer invariants checked with proptest over random
//! quad sets spread across a handful of graphs.

use proptest::collection::vec;
use proptest::prelude::*;
use quadwright_core::{
    MemoryStore, QuadStore, Session, SessionConfig, Statement, StatementKind, Term,
    UpdateOperation,
};
use std::collections::BTreeSet;

fn ex(local: &str) -> Term {
    Term::iri(format!("http://example.org/{local}"))
}

fn graph_name(g: u8) -> Term {
    ex(&format!("g{g}"))
}

fn to_quads(raw: &[(u16, u8, u16, u8)]) -> Vec<Statement> {
    raw.iter()
        .map(|&(s, p, o, g)| {
            Statement::quad(
                ex(&format!("s{s}")),
                ex(&format!("p{p}")),
                ex(&format!("o{o}")),
                graph_name(g),
            )
        })
        .collect()
}

fn session_over(quads: &[Statement]) -> Session {
    let store = MemoryStore::quads();
    store
        .add_statements(quads, StatementKind::Explicit)
        .expect("seed");
    Session::with_store(store, SessionConfig::default()).expect("session")
}

fn graph(session: &Session, g: u8) -> BTreeSet<Statement> {
    session.memory_store().expect("in-memory").graph(&graph_name(g))
}

fn restated(statements: &BTreeSet<Statement>, g: u8) -> BTreeSet<Statement> {
    statements
        .iter()
        .map(|s| s.with_context(Some(graph_name(g))))
        .collect()
}

fn quad_sets() -> impl Strategy<Value = Vec<(u16, u8, u16, u8)>> {
    vec((0u16..30, 0u8..3, 0u16..30, 0u8..3), 0..60)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// CLEAR and DROP of the same graph leave identical stores.
    #[test]
    fn clear_and_drop_agree(raw in quad_sets(), target in 0u8..3) {
        let quads = to_quads(&raw);
        let cleared = session_over(&quads);
        let dropped = session_over(&quads);

        cleared.execute_update([UpdateOperation::clear(graph_name(target))]).expect("clear");
        dropped.execute_update([UpdateOperation::drop_graph(graph_name(target))]).expect("drop");

        prop_assert!(graph(&cleared, target).is_empty());
        prop_assert_eq!(
            cleared.memory_store().expect("mem").statements(),
            dropped.memory_store().expect("mem").statements()
        );
    }

    /// ADD unions the source into the target and keeps the source.
    #[test]
    fn add_is_union(raw in quad_sets(), source in 0u8..3, target in 0u8..3) {
        prop_assume!(source != target);
        let session = session_over(&to_quads(&raw));
        let pre_src = graph(&session, source);
        let pre_dst = graph(&session, target);

        session
            .execute_update([UpdateOperation::add(graph_name(source), graph_name(target))])
            .expect("add");

        let expected: BTreeSet<Statement> =
            pre_dst.union(&restated(&pre_src, target)).cloned().collect();
        prop_assert_eq!(graph(&session, target), expected);
        prop_assert_eq!(graph(&session, source), pre_src);
    }

    /// MOVE replaces the target with the source and empties the source.
    #[test]
    fn move_transfers_graph(raw in quad_sets(), source in 0u8..3, target in 0u8..3) {
        prop_assume!(source != target);
        let session = session_over(&to_quads(&raw));
        let pre_src = graph(&session, source);
        let bystander = (0u8..3).find(|g| *g != source && *g != target);
        let pre_bystander = bystander.map(|g| graph(&session, g));

        session
            .execute_update([UpdateOperation::move_graph(graph_name(source), graph_name(target))])
            .expect("move");

        prop_assert_eq!(graph(&session, target), restated(&pre_src, target));
        prop_assert!(graph(&session, source).is_empty());
        prop_assert_eq!(bystander.map(|g| graph(&session, g)), pre_bystander);
    }

    /// COPY applied twice equals COPY applied once.
    #[test]
    fn copy_is_idempotent(raw in quad_sets(), source in 0u8..3, target in 0u8..3) {
        let quads = to_quads(&raw);
        let once = session_over(&quads);
        let twice = session_over(&quads);
        let op = UpdateOperation::copy(graph_name(source), graph_name(target));

        once.execute_update([op.clone()]).expect("copy");
        twice.execute_update([op.clone(), op]).expect("copy twice");

        prop_assert_eq!(
            once.memory_store().expect("mem").statements(),
            twice.memory_store().expect("mem").statements()
        );
    }

    /// Flushing N distinct new statements reports N.
    #[test]
    fn flush_reports_statement_count(raw in quad_sets(), capacity in 1usize..20) {
        let distinct: BTreeSet<Statement> = to_quads(&raw).into_iter().collect();
        let session = Session::new(SessionConfig::default()).expect("session");
        let mut buffer = session
            .assertion_buffer_with_capacity(capacity, false)
            .expect("buffer");

        let mut flushed = 0;
        for statement in &distinct {
            if buffer.near_capacity() {
                flushed += buffer.flush().expect("flush");
            }
            prop_assert!(buffer.add(statement.clone(), None).expect("add"));
        }
        flushed += buffer.flush().expect("flush");

        prop_assert_eq!(flushed, distinct.len());
        prop_assert_eq!(session.store().statement_count().expect("count"), distinct.len() as u64);
    }

    /// A triples-mode store never holds a context.
    #[test]
    fn triples_mode_holds_no_contexts(raw in quad_sets()) {
        let config = SessionConfig { quads: false, ..SessionConfig::default() };
        let session = Session::new(config).expect("session");

        session
            .execute_update([UpdateOperation::insert_data(to_quads(&raw))])
            .expect("insert");

        let statements = session.memory_store().expect("mem").statements();
        prop_assert!(statements.iter().all(|s| s.context.is_none()));
    }
}
