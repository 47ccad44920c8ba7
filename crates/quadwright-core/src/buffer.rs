//! # Assertion Buffer
//!
//! Bounded holding area for statements produced by rule evaluation, with
//! optional paired justifications.
//!
//! ## Lifecycle
//!
//! `Empty -> Filling -> NearCapacity -> Flushing -> Empty`
//!
//! A flush writes the statements as one batch. When justifications are
//! pending it writes both batches at once on the `WriterPool`, waits for
//! both, and only then resets the buffer. A failed flush leaves everything
//! pending.
//!
//! ## Threading
//!
//! `add` is not safe for concurrent producers; callers serialise admission.
//! The two writer tasks of one flush are the only code running in parallel.

use crate::store::QuadStore;
use crate::{Justification, Statement, StatementKind, UpdateError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

// =============================================================================
// ADMISSION FILTER
// =============================================================================

/// Decides which statements never enter the buffer.
pub trait StatementFilter {
    /// True if the statement must be dropped.
    fn rejects(&self, statement: &Statement) -> bool;
}

impl<F> StatementFilter for F
where
    F: Fn(&Statement) -> bool,
{
    fn rejects(&self, statement: &Statement) -> bool {
        self(statement)
    }
}

/// Rejects a fixed set of statements, such as the axioms a rule set
/// would otherwise re-derive on every pass.
#[derive(Debug, Clone, Default)]
pub struct AxiomFilter {
    axioms: BTreeSet<Statement>,
}

impl AxiomFilter {
    #[must_use]
    pub fn new(axioms: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            axioms: axioms.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }
}

impl StatementFilter for AxiomFilter {
    fn rejects(&self, statement: &Statement) -> bool {
        self.axioms.contains(statement)
    }
}

// =============================================================================
// WRITER POOL
// =============================================================================

/// Fixed-size thread pool for the dual statement/justification write.
///
/// Owned by a session and shared by every buffer it creates. Cloning shares
/// the same threads; they stop when the last clone is dropped.
#[derive(Clone)]
pub struct WriterPool {
    pool: Arc<ThreadPool>,
    threads: usize,
}

impl fmt::Debug for WriterPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterPool")
            .field("threads", &self.threads)
            .finish()
    }
}

impl WriterPool {
    pub fn new(threads: usize) -> Result<Self, UpdateError> {
        if threads == 0 {
            return Err(UpdateError::PreconditionViolation(
                "writer pool needs at least one thread".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("quadwright-writer-{i}"))
            .build()
            .map_err(|e| UpdateError::Io(format!("cannot start writer pool: {}", e)))?;

        Ok(Self {
            pool: Arc::new(pool),
            threads,
        })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run two closures on the pool and wait for both.
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.pool.join(a, b)
    }
}

// =============================================================================
// ASSERTION BUFFER
// =============================================================================

/// Bounded buffer of pending inferred statements and their justifications.
pub struct AssertionBuffer<'s> {
    store: &'s dyn QuadStore,
    pool: &'s WriterPool,
    filter: Option<Box<dyn StatementFilter + 's>>,
    capacity: usize,
    justify: bool,
    statements: Vec<Statement>,
    justifications: Vec<Justification>,
}

impl fmt::Debug for AssertionBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionBuffer")
            .field("capacity", &self.capacity)
            .field("justify", &self.justify)
            .field("statements", &self.statements.len())
            .field("justifications", &self.justifications.len())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl<'s> AssertionBuffer<'s> {
    /// Create a buffer. `justify` is fixed for the buffer's lifetime.
    pub fn new(
        store: &'s dyn QuadStore,
        pool: &'s WriterPool,
        capacity: usize,
        justify: bool,
    ) -> Result<Self, UpdateError> {
        if capacity == 0 {
            return Err(UpdateError::PreconditionViolation(
                "buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            store,
            pool,
            filter: None,
            capacity,
            justify,
            statements: Vec::with_capacity(capacity),
            justifications: Vec::with_capacity(if justify { capacity } else { 0 }),
        })
    }

    /// Install an admission filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl StatementFilter + 's) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Offer a statement.
    ///
    /// Returns `Ok(false)` if the filter rejected it. A justification must be
    /// supplied exactly when the buffer justifies; a mismatch, or an add to a
    /// full buffer, is a `PreconditionViolation`.
    pub fn add(
        &mut self,
        statement: Statement,
        justification: Option<Justification>,
    ) -> Result<bool, UpdateError> {
        if self
            .filter
            .as_ref()
            .is_some_and(|f| f.rejects(&statement))
        {
            tracing::trace!(%statement, "statement filtered");
            return Ok(false);
        }

        if self.justify != justification.is_some() {
            return Err(UpdateError::PreconditionViolation(format!(
                "buffer justify={} but justification {}",
                self.justify,
                if justification.is_some() {
                    "given"
                } else {
                    "missing"
                }
            )));
        }

        if self.statements.len() >= self.capacity || self.justifications.len() >= self.capacity
        {
            return Err(UpdateError::PreconditionViolation(format!(
                "buffer full ({} statements)",
                self.capacity
            )));
        }

        self.statements.push(statement);
        if let Some(j) = justification {
            self.justifications.push(j);
        }
        Ok(true)
    }

    /// True when the next admission would overflow either slot.
    #[must_use]
    pub fn near_capacity(&self) -> bool {
        self.statements.len() + 1 > self.capacity || self.justifications.len() + 1 > self.capacity
    }

    /// Write everything pending. Returns the statement write's count.
    ///
    /// On failure the buffer keeps its contents for a later retry.
    pub fn flush(&mut self) -> Result<usize, UpdateError> {
        if self.statements.is_empty() && self.justifications.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let written = if self.justifications.is_empty() {
            self.store
                .add_statements(&self.statements, StatementKind::Inferred)?
        } else {
            let store = self.store;
            let statements = &self.statements;
            let justifications = &self.justifications;

            let ((stmt_result, stmt_ms), (just_result, just_ms)) = self.pool.join(
                || timed(|| store.add_statements(statements, StatementKind::Inferred)),
                || timed(|| store.add_justifications(justifications)),
            );

            tracing::debug!(
                statements_ms = stmt_ms,
                justifications_ms = just_ms,
                "concurrent writers finished"
            );

            let written =
                stmt_result.map_err(|e| UpdateError::ConcurrentWriteFailure(Box::new(e)))?;
            just_result.map_err(|e| UpdateError::ConcurrentWriteFailure(Box::new(e)))?;
            written
        };

        tracing::info!(
            statements = self.statements.len(),
            justifications = self.justifications.len(),
            written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "assertion buffer flushed"
        );

        self.statements.clear();
        self.justifications.clear();
        Ok(written)
    }

    /// Pending statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.justifications.is_empty()
    }

    /// Pending justifications.
    #[must_use]
    pub fn justification_count(&self) -> usize {
        self.justifications.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_justified(&self) -> bool {
        self.justify
    }
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Term;
    use crate::store::{MemoryStore, StatementCursor, StatementPattern};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn stmt(i: usize) -> Statement {
        Statement::quad(ex(&format!("s{i}")), ex("type"), ex("Thing"), ex("inf"))
    }

    fn just(i: usize) -> Justification {
        Justification::new("rdfs9", stmt(i), vec![stmt(i + 1000)])
    }

    /// Wraps a `MemoryStore`, counting writes and optionally failing one side.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        fail_statements: AtomicBool,
        fail_justifications: AtomicBool,
    }

    impl QuadStore for FaultyStore {
        fn is_quads(&self) -> bool {
            self.inner.is_quads()
        }
        fn add_statements(
            &self,
            batch: &[Statement],
            kind: StatementKind,
        ) -> Result<usize, UpdateError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_statements.load(Ordering::SeqCst) {
                return Err(UpdateError::Storage("statement index full".to_string()));
            }
            self.inner.add_statements(batch, kind)
        }
        fn add_justifications(&self, batch: &[Justification]) -> Result<usize, UpdateError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_justifications.load(Ordering::SeqCst) {
                return Err(UpdateError::Storage("justification index full".to_string()));
            }
            self.inner.add_justifications(batch)
        }
        fn remove_statements(&self, pattern: &StatementPattern) -> Result<usize, UpdateError> {
            self.inner.remove_statements(pattern)
        }
        fn range_count(&self, pattern: &StatementPattern, exact: bool) -> Result<u64, UpdateError> {
            self.inner.range_count(pattern, exact)
        }
        fn get_statements(
            &self,
            pattern: &StatementPattern,
            include_inferred: bool,
        ) -> Result<StatementCursor, UpdateError> {
            self.inner.get_statements(pattern, include_inferred)
        }
        fn justification_count(&self) -> Result<u64, UpdateError> {
            self.inner.justification_count()
        }
        fn commit(&self) -> Result<(), UpdateError> {
            self.inner.commit()
        }
    }

    fn pool() -> WriterPool {
        WriterPool::new(2).expect("pool")
    }

    #[test]
    fn capacity_three_scenario() {
        let store = MemoryStore::quads();
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 3, true).expect("buffer");

        buffer.add(stmt(0), Some(just(0))).expect("add");
        buffer.add(stmt(1), Some(just(1))).expect("add");
        assert!(!buffer.near_capacity());
        buffer.add(stmt(2), Some(just(2))).expect("add");
        assert!(buffer.near_capacity());

        assert_eq!(buffer.flush().expect("flush"), 3);
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.justification_count(), 0);
        assert_eq!(store.justification_count().expect("count"), 3);
        assert_eq!(store.kind_of(&stmt(0)), Some(StatementKind::Inferred));
    }

    #[test]
    fn pairing_is_enforced_both_ways() {
        let store = MemoryStore::quads();
        let pool = pool();

        let mut justified = AssertionBuffer::new(&store, &pool, 4, true).expect("buffer");
        assert!(matches!(
            justified.add(stmt(0), None),
            Err(UpdateError::PreconditionViolation(_))
        ));

        let mut plain = AssertionBuffer::new(&store, &pool, 4, false).expect("buffer");
        assert!(matches!(
            plain.add(stmt(0), Some(just(0))),
            Err(UpdateError::PreconditionViolation(_))
        ));
        assert!(justified.is_empty() && plain.is_empty());
    }

    #[test]
    fn filtered_statements_are_not_counted() {
        let store = MemoryStore::quads();
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, false)
            .expect("buffer")
            .with_filter(AxiomFilter::new([stmt(0)]));

        assert!(!buffer.add(stmt(0), None).expect("filtered"));
        assert!(buffer.add(stmt(1), None).expect("kept"));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn closure_filter() {
        let store = MemoryStore::quads();
        let pool = pool();
        let blocked = ex("s1");
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, false)
            .expect("buffer")
            .with_filter(move |s: &Statement| s.subject == blocked);

        assert!(buffer.add(stmt(0), None).expect("add"));
        assert!(!buffer.add(stmt(1), None).expect("add"));
    }

    #[test]
    fn full_buffer_rejects_add() {
        let store = MemoryStore::quads();
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 1, false).expect("buffer");

        buffer.add(stmt(0), None).expect("add");
        assert!(matches!(
            buffer.add(stmt(1), None),
            Err(UpdateError::PreconditionViolation(_))
        ));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn empty_flush_writes_nothing() {
        let store = FaultyStore::default();
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, true).expect("buffer");

        assert_eq!(buffer.flush().expect("flush"), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unjustified_flush_is_a_single_write() {
        let store = FaultyStore::default();
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, false).expect("buffer");
        buffer.add(stmt(0), None).expect("add");
        buffer.add(stmt(1), None).expect("add");

        assert_eq!(buffer.flush().expect("flush"), 2);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_flush_keeps_contents_for_retry() {
        let store = FaultyStore::default();
        store.fail_justifications.store(true, Ordering::SeqCst);
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, true).expect("buffer");
        buffer.add(stmt(0), Some(just(0))).expect("add");
        buffer.add(stmt(1), Some(just(1))).expect("add");

        let err = buffer.flush().expect_err("justification write fails");
        assert!(matches!(err, UpdateError::ConcurrentWriteFailure(_)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.justification_count(), 2);

        store.fail_justifications.store(false, Ordering::SeqCst);
        assert_eq!(buffer.flush().expect("retry"), 0);
        assert!(buffer.is_empty());
        assert_eq!(store.justification_count().expect("count"), 2);
    }

    #[test]
    fn failed_statement_write_keeps_justified_contents() {
        let store = FaultyStore::default();
        store.fail_statements.store(true, Ordering::SeqCst);
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, true).expect("buffer");
        buffer.add(stmt(0), Some(just(0))).expect("add");
        buffer.add(stmt(1), Some(just(1))).expect("add");

        let err = buffer.flush().expect_err("statement write fails");
        assert!(matches!(err, UpdateError::ConcurrentWriteFailure(_)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.justification_count(), 2);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);

        store.fail_statements.store(false, Ordering::SeqCst);
        assert_eq!(buffer.flush().expect("retry"), 2);
        assert!(buffer.is_empty());
        assert_eq!(store.inner.kind_of(&stmt(1)), Some(StatementKind::Inferred));
    }

    #[test]
    fn failed_single_write_keeps_contents() {
        let store = FaultyStore::default();
        store.fail_statements.store(true, Ordering::SeqCst);
        let pool = pool();
        let mut buffer = AssertionBuffer::new(&store, &pool, 4, false).expect("buffer");
        buffer.add(stmt(0), None).expect("add");
        buffer.add(stmt(1), None).expect("add");

        let err = buffer.flush().expect_err("statement write fails");
        assert!(matches!(err, UpdateError::Storage(_)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        store.fail_statements.store(false, Ordering::SeqCst);
        assert_eq!(buffer.flush().expect("retry"), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn zero_capacity_and_zero_threads_rejected() {
        let store = MemoryStore::quads();
        let pool = pool();
        assert!(AssertionBuffer::new(&store, &pool, 0, false).is_err());
        assert!(WriterPool::new(0).is_err());
    }
}
