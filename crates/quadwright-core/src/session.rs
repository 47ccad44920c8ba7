//! # Session Module
//!
//! A session ties a storage backend, a writer pool and a configuration
//! together, and is the entry point for running updates and buffered
//! inference writes.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile unless explicitly dumped)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage

use crate::UpdateError;
use crate::buffer::{AssertionBuffer, WriterPool};
use crate::config::SessionConfig;
use crate::loader::DataLoader;
use crate::query::PatternEvaluator;
use crate::storage::RedbStore;
use crate::store::{MemoryStore, QuadStore};
use crate::update::{UpdateExecutionContext, UpdateOperation, UpdatePlanCompiler};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl StorageBackend {
    #[must_use]
    pub fn store(&self) -> &dyn QuadStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

/// A store plus the resources updates and flushes run on.
#[derive(Debug)]
pub struct Session {
    backend: StorageBackend,
    config: SessionConfig,
    writer_pool: WriterPool,
    loader: DataLoader,
    evaluator: PatternEvaluator,
}

impl Session {
    /// Create a session with an empty in-memory store.
    pub fn new(config: SessionConfig) -> Result<Self, UpdateError> {
        let store = MemoryStore::new(config.quads);
        Self::with_backend(StorageBackend::InMemory(store), config)
    }

    /// Create a session over an existing in-memory store.
    pub fn with_store(store: MemoryStore, config: SessionConfig) -> Result<Self, UpdateError> {
        Self::with_backend(StorageBackend::InMemory(store), config)
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path. A new database
    /// takes its mode from `config.quads`.
    pub fn with_redb(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self, UpdateError> {
        let store = RedbStore::open(path, config.quads)?;
        Self::with_backend(StorageBackend::Persistent(store), config)
    }

    /// Create a session over any backend, with the default document loader.
    pub fn with_backend(
        backend: StorageBackend,
        config: SessionConfig,
    ) -> Result<Self, UpdateError> {
        let loader = DataLoader::with_defaults()?;
        Self::with_loader(backend, config, loader)
    }

    /// Create a session with a custom document loader.
    pub fn with_loader(
        backend: StorageBackend,
        config: SessionConfig,
        loader: DataLoader,
    ) -> Result<Self, UpdateError> {
        config.validate()?;
        let writer_pool = WriterPool::new(config.writer_threads)?;
        Ok(Self {
            backend,
            config,
            writer_pool,
            loader,
            evaluator: PatternEvaluator,
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn store(&self) -> &dyn QuadStore {
        self.backend.store()
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// The in-memory store, for in-memory sessions.
    #[must_use]
    pub fn memory_store(&self) -> Option<&MemoryStore> {
        match &self.backend {
            StorageBackend::InMemory(s) => Some(s),
            StorageBackend::Persistent(_) => None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn writer_pool(&self) -> &WriterPool {
        &self.writer_pool
    }

    /// An execution context configured from this session.
    #[must_use]
    pub fn context(&self) -> UpdateExecutionContext<'_> {
        UpdateExecutionContext::new(self.store())
            .with_namespace(&self.config.namespace, &self.config.lexicon_namespace)
            .include_inferred(self.config.include_inferred)
            .clustered(self.config.cluster)
            .disable(self.config.disabled_updates.iter().copied())
    }

    /// Run an update sequence.
    pub fn execute_update(
        &self,
        operations: impl IntoIterator<Item = UpdateOperation>,
    ) -> Result<(), UpdateError> {
        let ctx = self.context();
        UpdatePlanCompiler::new(&self.evaluator, &self.loader).execute(operations, &ctx)
    }

    /// A buffer with the configured capacity, bound to this session's store
    /// and writer pool.
    pub fn assertion_buffer(&self, justify: bool) -> Result<AssertionBuffer<'_>, UpdateError> {
        self.assertion_buffer_with_capacity(self.config.buffer_capacity, justify)
    }

    pub fn assertion_buffer_with_capacity(
        &self,
        capacity: usize,
        justify: bool,
    ) -> Result<AssertionBuffer<'_>, UpdateError> {
        AssertionBuffer::new(self.store(), &self.writer_pool, capacity, justify)
    }
}
