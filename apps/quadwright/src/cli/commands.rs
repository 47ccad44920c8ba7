//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use quadwright_core::loader::{NQuadsParser, StatementParser, write_nquads};
use quadwright_core::{
    MemoryStore, QuadStore, RedbStore, Session, SessionConfig, StatementPattern, StorageBackend,
    Term, UpdateError, UpdateOperation,
};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of an update sequence file (100 MB).
const MAX_UPDATE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum size of an N-Quads store file (500 MB).
const MAX_STORE_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), UpdateError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| UpdateError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(UpdateError::PreconditionViolation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, UpdateError> {
    let canonical = path.canonicalize().map_err(|e| {
        UpdateError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(UpdateError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, UpdateError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        UpdateError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(UpdateError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| UpdateError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) -> Result<(), UpdateError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| UpdateError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    json_mode: bool,
) -> Result<(), UpdateError> {
    let session = load_or_create_session(db_path, backend, config)?;
    let store = session.store();
    let statements = store.statement_count()?;
    let justifications = store.justification_count()?;
    let contexts = store.contexts()?.len();
    let commits = match session.backend() {
        StorageBackend::InMemory(s) => s.commit_count(),
        StorageBackend::Persistent(s) => s.commit_count()?,
    };
    let mode = if store.is_quads() { "quads" } else { "triples" };

    if json_mode {
        return print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "mode": mode,
            "statements": statements,
            "contexts": contexts,
            "justifications": justifications,
            "commits": commits
        }));
    }

    println!("Quadwright Store Status");
    println!("=======================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!("Mode:     {}", mode);
    println!();
    println!("Statements:     {}", statements);
    println!("Contexts:       {}", contexts);
    println!("Justifications: {}", justifications);
    println!("Commits:        {}", commits);

    Ok(())
}

// =============================================================================
// UPDATE COMMAND
// =============================================================================

/// Parse a JSON array of update operations.
pub fn parse_operations(json: &str) -> Result<Vec<UpdateOperation>, UpdateError> {
    serde_json::from_str(json)
        .map_err(|e| UpdateError::Serialization(format!("Invalid update sequence: {}", e)))
}

/// Run an update sequence read from a file.
pub fn cmd_update(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    json_mode: bool,
    file: &Path,
) -> Result<(), UpdateError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_UPDATE_FILE_SIZE)?;

    let content = std::fs::read_to_string(&validated_path)?;
    let operations = parse_operations(&content)?;
    let count = operations.len();

    run_and_save(db_path, backend, config, json_mode, operations, |before, after| {
        println!("Applied {} operations", count);
        println!("  Statements: {} -> {}", before, after);
    })
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// LOAD a single document.
pub fn cmd_load(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    json_mode: bool,
    url: &str,
    into: Option<&str>,
    silent: bool,
) -> Result<(), UpdateError> {
    let mut operation = match into {
        Some(graph) => UpdateOperation::load_into(url, Term::iri(graph)),
        None => UpdateOperation::load(url),
    };
    if silent {
        operation = operation.silent();
    }

    run_and_save(db_path, backend, config, json_mode, vec![operation], |before, after| {
        println!("Loaded {}", url);
        println!("  Statements added: {}", after.saturating_sub(before));
    })
}

/// Shared tail of `update` and `load`: execute, persist, report.
fn run_and_save(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    json_mode: bool,
    operations: Vec<UpdateOperation>,
    report: impl FnOnce(u64, u64),
) -> Result<(), UpdateError> {
    let session = load_or_create_session(db_path, backend, config)?;
    let count = operations.len();

    let before = session.store().statement_count()?;
    let result = session.execute_update(operations);
    // Operations before a failure stay applied, so the store is saved either way.
    save_session(&session, db_path)?;
    result?;
    let after = session.store().statement_count()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "success": true,
            "operations": count,
            "statements_before": before,
            "statements_after": after
        }));
    }

    report(before, after);
    Ok(())
}

// =============================================================================
// DUMP COMMAND
// =============================================================================

/// Write every statement, explicit and inferred, as N-Quads.
pub fn cmd_dump(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    output: Option<&Path>,
) -> Result<(), UpdateError> {
    let session = load_or_create_session(db_path, backend, config)?;

    match output {
        Some(path) => {
            let validated_output = validate_output_path(path)?;
            let written = dump_to_file(session.store(), &validated_output)?;
            eprintln!("Dumped {} statements to {:?}", written, validated_output);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            dump_store(session.store(), &mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Write a store's statements to a writer.
pub fn dump_store<W: Write>(store: &dyn QuadStore, writer: &mut W) -> Result<usize, UpdateError> {
    let statements = store
        .get_statements(&StatementPattern::any(), true)?
        .collect_all()?;
    write_nquads(writer, &statements)
}

fn dump_to_file(store: &dyn QuadStore, path: &Path) -> Result<usize, UpdateError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = dump_store(store, &mut writer)?;
    writer.flush()?;
    Ok(written)
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new store.
pub fn cmd_init(
    db_path: &Path,
    backend: &str,
    config: SessionConfig,
    force: bool,
) -> Result<(), UpdateError> {
    if db_path.exists() {
        if !force {
            return Err(UpdateError::PreconditionViolation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)?;
    }

    let mode = if config.quads { "quads" } else { "triples" };
    match backend {
        "redb" => {
            let _session = Session::with_redb(db_path, config)?;
            println!("Initialized new {} redb store at {:?}", mode, db_path);
        }
        _ => {
            let session = Session::new(config)?;
            save_session(&session, db_path)?;
            println!("Initialized new {} file store at {:?}", mode, db_path);
        }
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session from a store path with the specified backend.
///
/// An existing redb store keeps the mode it was created with, whatever the
/// configuration says.
pub fn load_or_create_session(
    db_path: &Path,
    backend: &str,
    mut config: SessionConfig,
) -> Result<Session, UpdateError> {
    match backend {
        "redb" => {
            if db_path.exists() {
                let store = RedbStore::open_existing(db_path)?;
                config.quads = store.is_quads();
                Session::with_backend(StorageBackend::Persistent(store), config)
            } else {
                Session::with_redb(db_path, config)
            }
        }
        "file" => {
            let store = MemoryStore::new(config.quads);
            if db_path.exists() {
                read_store_file(&store, db_path)?;
            }
            Session::with_store(store, config)
        }
        other => Err(UpdateError::UnsupportedUpdate(format!(
            "Unknown backend: {}. Use: redb, file",
            other
        ))),
    }
}

/// Read an N-Quads store file. Statements without a graph land in the
/// null graph of a quads store.
fn read_store_file(store: &MemoryStore, path: &Path) -> Result<u64, UpdateError> {
    validate_file_size(path, MAX_STORE_FILE_SIZE)?;
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let quads = store.is_quads();
    let null_graph = Term::null_graph();

    NQuadsParser::nquads().parse(&mut reader, &mut |statement| {
        let statement = statement.contextualize(quads, Some(&null_graph));
        store.add_statement(&statement)?;
        Ok(())
    })
}

/// Save a session to a store path.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), UpdateError> {
    if session.is_persistent() {
        // Redb backend - already persisted, nothing to do
        Ok(())
    } else {
        dump_to_file(session.store(), db_path).map(|_| ())
    }
}
