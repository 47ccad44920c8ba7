//! # redb-backed Statement Storage
//!
//! A disk-backed `QuadStore` using the redb embedded database, providing:
//! - ACID transactions (one write transaction per store call)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Statements and justifications are keyed by their postcard encoding, so
//! duplicates collapse on insert. Pattern reads are full scans; index
//! selection belongs to the storage engine, not to the update path.

use crate::store::{QuadStore, StatementCursor, StatementPattern, check_mode};
use crate::{Justification, Statement, StatementKind, UpdateError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for statements: postcard(Statement) -> kind byte
const STATEMENTS: TableDefinition<&[u8], u8> = TableDefinition::new("statements");

/// Table for justifications: postcard(Justification) -> unused marker
const JUSTIFICATIONS: TableDefinition<&[u8], u8> = TableDefinition::new("justifications");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const KIND_EXPLICIT: u8 = 0;
const KIND_INFERRED: u8 = 1;

fn storage_err(e: impl std::fmt::Display) -> UpdateError {
    UpdateError::Storage(e.to_string())
}

fn kind_byte(kind: StatementKind) -> u8 {
    match kind {
        StatementKind::Explicit => KIND_EXPLICIT,
        StatementKind::Inferred => KIND_INFERRED,
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, UpdateError> {
    postcard::to_allocvec(value).map_err(|e| UpdateError::Serialization(e.to_string()))
}

fn decode_statement(bytes: &[u8]) -> Result<Statement, UpdateError> {
    postcard::from_bytes(bytes).map_err(|e| UpdateError::Serialization(e.to_string()))
}

/// A disk-backed statement store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Quads or triples mode, fixed when the database is created.
    quads: bool,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("quads", &self.quads)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    ///
    /// A new database records `quads`; an existing one must have been
    /// created in the same mode.
    pub fn open(path: impl AsRef<Path>, quads: bool) -> Result<Self, UpdateError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist and pin the store mode
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(STATEMENTS).map_err(storage_err)?;
            let _ = write_txn.open_table(JUSTIFICATIONS).map_err(storage_err)?;
            {
                let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
                let recorded = meta
                    .get("quads")
                    .map_err(storage_err)?
                    .map(|v| v.value());
                match recorded {
                    Some(flag) if (flag == 1) != quads => {
                        return Err(UpdateError::PreconditionViolation(format!(
                            "store at {} was created in {} mode",
                            path.as_ref().display(),
                            if flag == 1 { "quads" } else { "triples" }
                        )));
                    }
                    Some(_) => {}
                    None => {
                        meta.insert("quads", u64::from(quads))
                            .map_err(storage_err)?;
                    }
                }
            }
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db, quads })
    }

    /// Open an existing store in whatever mode it was created with.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, UpdateError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;
        let quads = {
            let read_txn = db.begin_read().map_err(storage_err)?;
            let meta = read_txn.open_table(METADATA).map_err(storage_err)?;
            meta.get("quads")
                .map_err(storage_err)?
                .map(|v| v.value() == 1)
                .ok_or_else(|| {
                    UpdateError::Storage(format!(
                        "{} is not an initialised store",
                        path.as_ref().display()
                    ))
                })?
        };
        Ok(Self { db, quads })
    }

    /// Number of commits recorded in the database.
    pub fn commit_count(&self) -> Result<u64, UpdateError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let meta = read_txn.open_table(METADATA).map_err(storage_err)?;
        Ok(meta
            .get("commits")
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0))
    }

    /// Scan the statement table, keeping the entries the filter accepts.
    fn scan(
        &self,
        mut keep: impl FnMut(&Statement, u8) -> bool,
    ) -> Result<Vec<Statement>, UpdateError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(STATEMENTS).map_err(storage_err)?;

        let mut out = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            let statement = decode_statement(key.value())?;
            if keep(&statement, value.value()) {
                out.push(statement);
            }
        }
        Ok(out)
    }
}

// =============================================================================
// QUADSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl QuadStore for RedbStore {
    fn is_quads(&self) -> bool {
        self.quads
    }

    fn add_statements(
        &self,
        batch: &[Statement],
        kind: StatementKind,
    ) -> Result<usize, UpdateError> {
        check_mode(self.quads, batch)?;
        if batch.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(STATEMENTS).map_err(storage_err)?;
            for statement in batch {
                let key = encode(statement)?;
                let existing = table
                    .get(key.as_slice())
                    .map_err(storage_err)?
                    .map(|v| v.value());
                let upgrade = existing == Some(KIND_INFERRED) && kind == StatementKind::Explicit;
                if existing.is_none() || upgrade {
                    table
                        .insert(key.as_slice(), kind_byte(kind))
                        .map_err(storage_err)?;
                    written += 1;
                }
            }
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(written)
    }

    fn add_justifications(&self, batch: &[Justification]) -> Result<usize, UpdateError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(JUSTIFICATIONS).map_err(storage_err)?;
            for justification in batch {
                let key = encode(justification)?;
                if table
                    .insert(key.as_slice(), 0u8)
                    .map_err(storage_err)?
                    .is_none()
                {
                    written += 1;
                }
            }
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(written)
    }

    fn remove_statements(&self, pattern: &StatementPattern) -> Result<usize, UpdateError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let removed = {
            let mut table = write_txn.open_table(STATEMENTS).map_err(storage_err)?;

            let mut doomed = Vec::new();
            for entry in table.iter().map_err(storage_err)? {
                let (key, _) = entry.map_err(storage_err)?;
                let bytes = key.value();
                if pattern.matches(&decode_statement(bytes)?) {
                    doomed.push(bytes.to_vec());
                }
            }

            for key in &doomed {
                table.remove(key.as_slice()).map_err(storage_err)?;
            }
            doomed.len()
        };
        write_txn.commit().map_err(storage_err)?;

        Ok(removed)
    }

    fn range_count(&self, pattern: &StatementPattern, _exact: bool) -> Result<u64, UpdateError> {
        if *pattern == StatementPattern::any() {
            let read_txn = self.db.begin_read().map_err(storage_err)?;
            let table = read_txn.open_table(STATEMENTS).map_err(storage_err)?;
            return table.len().map_err(storage_err);
        }
        Ok(self.scan(|s, _| pattern.matches(s))?.len() as u64)
    }

    fn get_statements(
        &self,
        pattern: &StatementPattern,
        include_inferred: bool,
    ) -> Result<StatementCursor, UpdateError> {
        let snapshot = self.scan(|s, kind| {
            (include_inferred || kind == KIND_EXPLICIT) && pattern.matches(s)
        })?;
        Ok(StatementCursor::from_statements(snapshot))
    }

    fn justification_count(&self) -> Result<u64, UpdateError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(JUSTIFICATIONS).map_err(storage_err)?;
        table.len().map_err(storage_err)
    }

    fn commit(&self) -> Result<(), UpdateError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            let commits = meta
                .get("commits")
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta.insert("commits", commits.saturating_add(1))
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }
}
