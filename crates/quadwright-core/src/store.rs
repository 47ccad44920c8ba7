//! # Statement Store
//!
//! The storage capability the update engine writes through.
//!
//! This module defines the `QuadStore` trait, the `StatementPattern` used to
//! address statements with wildcard semantics, the closable `StatementCursor`,
//! and `MemoryStore`, the in-memory implementation.
//!
//! Every method takes `&self`: the two writer tasks of an `AssertionBuffer`
//! flush share one store, so implementations guard their own state.

use crate::{Justification, Statement, StatementKind, Term, UpdateError};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// STATEMENT PATTERN
// =============================================================================

/// A statement pattern; `None` in any position matches every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementPattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
    pub context: Option<Term>,
}

impl StatementPattern {
    /// Match every statement in every context.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match every statement in one context.
    #[must_use]
    pub fn in_graph(context: Term) -> Self {
        Self {
            context: Some(context),
            ..Self::default()
        }
    }

    /// Match exactly the given statement. A statement without a context
    /// matches in every context.
    #[must_use]
    pub fn exact(statement: &Statement) -> Self {
        Self {
            subject: Some(statement.subject.clone()),
            predicate: Some(statement.predicate.clone()),
            object: Some(statement.object.clone()),
            context: statement.context.clone(),
        }
    }

    /// Check a statement against the pattern.
    #[must_use]
    pub fn matches(&self, statement: &Statement) -> bool {
        fn position(bound: Option<&Term>, value: &Term) -> bool {
            bound.is_none_or(|b| b == value)
        }

        position(self.subject.as_ref(), &statement.subject)
            && position(self.predicate.as_ref(), &statement.predicate)
            && position(self.object.as_ref(), &statement.object)
            && match &self.context {
                None => true,
                Some(c) => statement.context.as_ref() == Some(c),
            }
    }
}

// =============================================================================
// STATEMENT CURSOR
// =============================================================================

type CloseHook = Box<dyn FnOnce()>;

/// A lazy, finite, non-restartable sequence of statements.
///
/// The cursor is released exactly once: either by `close()` or when it is
/// dropped, including when the consumer bails out mid-iteration with `?`.
pub struct StatementCursor {
    inner: Box<dyn Iterator<Item = Result<Statement, UpdateError>>>,
    on_close: Option<CloseHook>,
}

impl StatementCursor {
    /// Wrap a fallible statement iterator.
    pub fn new(iter: impl Iterator<Item = Result<Statement, UpdateError>> + 'static) -> Self {
        Self {
            inner: Box::new(iter),
            on_close: None,
        }
    }

    /// A cursor over an already materialised snapshot.
    #[must_use]
    pub fn from_statements(statements: Vec<Statement>) -> Self {
        Self::new(statements.into_iter().map(Ok))
    }

    /// An exhausted cursor.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_statements(Vec::new())
    }

    /// Register a hook that runs when the cursor is released.
    ///
    /// Hooks registered earlier run first.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.on_close = Some(match self.on_close.take() {
            Some(previous) => Box::new(move || {
                previous();
                hook();
            }),
            None => Box::new(hook),
        });
        self
    }

    /// Release the cursor.
    pub fn close(self) {
        drop(self);
    }

    /// Drain the remaining statements.
    pub fn collect_all(mut self) -> Result<Vec<Statement>, UpdateError> {
        let mut out = Vec::new();
        for statement in &mut self {
            out.push(statement?);
        }
        Ok(out)
    }
}

impl Iterator for StatementCursor {
    type Item = Result<Statement, UpdateError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl Drop for StatementCursor {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl fmt::Debug for StatementCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCursor")
            .field("has_close_hook", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// QUADSTORE TRAIT
// =============================================================================

/// The statement store (the "connection") the update engine calls into.
///
/// Implementations must be safe to share between the two concurrent writers
/// of a flush. They do not need to order those writers relative to each
/// other: statements and justifications are disjoint data.
pub trait QuadStore: Send + Sync {
    /// True when the store keeps a context on every statement.
    fn is_quads(&self) -> bool;

    /// Write a batch of statements. Returns how many were new, or upgraded
    /// from inferred to explicit.
    fn add_statements(
        &self,
        batch: &[Statement],
        kind: StatementKind,
    ) -> Result<usize, UpdateError>;

    /// Write a batch of justifications. Returns how many were new.
    fn add_justifications(&self, batch: &[Justification]) -> Result<usize, UpdateError>;

    /// Remove every statement matching the pattern. Returns the number removed.
    fn remove_statements(&self, pattern: &StatementPattern) -> Result<usize, UpdateError>;

    /// Count statements matching the pattern.
    ///
    /// With `exact == false` an implementation may return an upper bound,
    /// but never a non-zero count for an empty range.
    fn range_count(&self, pattern: &StatementPattern, exact: bool) -> Result<u64, UpdateError>;

    /// Read the statements matching the pattern as of this call.
    fn get_statements(
        &self,
        pattern: &StatementPattern,
        include_inferred: bool,
    ) -> Result<StatementCursor, UpdateError>;

    /// Number of stored justifications.
    fn justification_count(&self) -> Result<u64, UpdateError>;

    /// Make all prior writes durable and visible as one unit.
    fn commit(&self) -> Result<(), UpdateError>;

    /// Write a single explicit statement. Returns true if it was new.
    fn add_statement(&self, statement: &Statement) -> Result<bool, UpdateError> {
        let written =
            self.add_statements(std::slice::from_ref(statement), StatementKind::Explicit)?;
        Ok(written > 0)
    }

    /// Total number of statements.
    fn statement_count(&self) -> Result<u64, UpdateError> {
        self.range_count(&StatementPattern::any(), true)
    }

    /// The distinct contexts in use, in order.
    fn contexts(&self) -> Result<Vec<Term>, UpdateError> {
        let mut contexts = BTreeSet::new();
        for statement in self.get_statements(&StatementPattern::any(), true)? {
            if let Some(c) = statement?.context {
                contexts.insert(c);
            }
        }
        Ok(contexts.into_iter().collect())
    }
}

/// Reject contexts on a triples-mode store.
pub(crate) fn check_mode(quads: bool, batch: &[Statement]) -> Result<(), UpdateError> {
    if !quads {
        if let Some(stmt) = batch.iter().find(|s| s.context.is_some()) {
            return Err(UpdateError::PreconditionViolation(format!(
                "triples-mode store cannot hold a context: {}",
                stmt
            )));
        }
    }
    Ok(())
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory statement store.
///
/// Uses `BTreeMap`/`BTreeSet` exclusively for deterministic ordering.
#[derive(Debug)]
pub struct MemoryStore {
    quads: bool,
    statements: RwLock<BTreeMap<Statement, StatementKind>>,
    justifications: RwLock<BTreeSet<Justification>>,
    commits: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MemoryStore {
    /// Create an empty store in quads or triples mode.
    #[must_use]
    pub fn new(quads: bool) -> Self {
        Self {
            quads,
            statements: RwLock::new(BTreeMap::new()),
            justifications: RwLock::new(BTreeSet::new()),
            commits: AtomicU64::new(0),
        }
    }

    /// Create an empty quads-mode store.
    #[must_use]
    pub fn quads() -> Self {
        Self::new(true)
    }

    /// Create an empty triples-mode store.
    #[must_use]
    pub fn triples() -> Self {
        Self::new(false)
    }

    /// Number of commits performed so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Snapshot of all statements in deterministic order.
    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.read().keys().cloned().collect()
    }

    /// Snapshot of the statements in one context.
    #[must_use]
    pub fn graph(&self, context: &Term) -> BTreeSet<Statement> {
        self.statements
            .read()
            .keys()
            .filter(|s| s.context.as_ref() == Some(context))
            .cloned()
            .collect()
    }

    /// The storage kind of a statement, if present.
    #[must_use]
    pub fn kind_of(&self, statement: &Statement) -> Option<StatementKind> {
        self.statements.read().get(statement).copied()
    }

    /// Snapshot of the stored justifications.
    #[must_use]
    pub fn justifications(&self) -> Vec<Justification> {
        self.justifications.read().iter().cloned().collect()
    }
}

impl QuadStore for MemoryStore {
    fn is_quads(&self) -> bool {
        self.quads
    }

    fn add_statements(
        &self,
        batch: &[Statement],
        kind: StatementKind,
    ) -> Result<usize, UpdateError> {
        check_mode(self.quads, batch)?;
        let mut statements = self.statements.write();
        let mut written = 0;
        for statement in batch {
            match statements.get_mut(statement) {
                Some(existing) => {
                    if *existing == StatementKind::Inferred && kind == StatementKind::Explicit {
                        *existing = StatementKind::Explicit;
                        written += 1;
                    }
                }
                None => {
                    statements.insert(statement.clone(), kind);
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    fn add_justifications(&self, batch: &[Justification]) -> Result<usize, UpdateError> {
        let mut justifications = self.justifications.write();
        Ok(batch
            .iter()
            .filter(|j| justifications.insert((*j).clone()))
            .count())
    }

    fn remove_statements(&self, pattern: &StatementPattern) -> Result<usize, UpdateError> {
        let mut statements = self.statements.write();
        let before = statements.len();
        statements.retain(|statement, _| !pattern.matches(statement));
        Ok(before - statements.len())
    }

    fn range_count(&self, pattern: &StatementPattern, _exact: bool) -> Result<u64, UpdateError> {
        let statements = self.statements.read();
        Ok(statements.keys().filter(|s| pattern.matches(s)).count() as u64)
    }

    fn get_statements(
        &self,
        pattern: &StatementPattern,
        include_inferred: bool,
    ) -> Result<StatementCursor, UpdateError> {
        let snapshot: Vec<Statement> = self
            .statements
            .read()
            .iter()
            .filter(|(s, kind)| {
                (include_inferred || **kind == StatementKind::Explicit) && pattern.matches(s)
            })
            .map(|(s, _)| s.clone())
            .collect();
        Ok(StatementCursor::from_statements(snapshot))
    }

    fn justification_count(&self) -> Result<u64, UpdateError> {
        Ok(self.justifications.read().len() as u64)
    }

    fn commit(&self) -> Result<(), UpdateError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
