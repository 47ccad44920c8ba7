//! # quadwright-core
//!
//! The update engine for an RDF quad store.
//!
//! This crate turns ordered sequences of declarative update requests into
//! effects on a statement store, and provides the bounded,
//! justification-aware write buffer used by rule evaluation.
//!
//! ## Components
//!
//! - `update` → operation model, graph/data/pattern executors, `UpdatePlanCompiler`
//! - `loader` → format registry, N-Triples/N-Quads parser, fetchers, `DataLoader`
//! - `buffer` → `AssertionBuffer`, admission filters, `WriterPool`
//! - `store` / `storage` → the `QuadStore` capability, `MemoryStore`, `RedbStore`
//! - `pattern` / `query` → WHERE patterns, templates, `PatternEvaluator`
//!
//! ## Architectural Constraints
//!
//! - Synchronous: no async runtime. The only parallelism is the dual write
//!   inside `AssertionBuffer::flush`
//! - Update operations run strictly in input order, one at a time
//! - No cross-operation rollback; atomicity is the store's, per call
//! - Library code never panics; every failure is an `UpdateError`

// =============================================================================
// MODULES
// =============================================================================

pub mod buffer;
pub mod config;
pub mod loader;
pub mod pattern;
pub mod primitives;
pub mod query;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod update;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Justification, Literal, Statement, StatementKind, Term, UpdateError};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::RedbStore;
pub use store::{MemoryStore, QuadStore, StatementCursor, StatementPattern};

// =============================================================================
// RE-EXPORTS: Update Engine
// =============================================================================

pub use buffer::{AssertionBuffer, AxiomFilter, StatementFilter, WriterPool};
pub use config::SessionConfig;
pub use loader::{DataLoader, FormatRegistry, LoadReport, RdfFormat};
pub use pattern::{GroupPattern, QuadPattern, QuadTemplate, StaticAnalysis, TermPattern, Variable};
pub use query::{ConstructQuery, PatternEvaluator, QueryEvaluator};
pub use session::{Session, StorageBackend};
pub use update::{
    ErrorPolicy, GraphRef, GraphScope, UpdateExecutionContext, UpdateKind, UpdateOperation,
    UpdatePlanCompiler,
};
