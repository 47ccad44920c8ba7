//! # Primitives
//!
//! Hardcoded constants for the update engine.
//!
//! These values are compiled into the binary. Runtime-tunable settings live
//! in `SessionConfig`; the constants here are their defaults and the limits
//! that guard parsing.

/// IRI of the reserved null graph.
///
/// Quads-mode processing binds this context whenever a statement needs an
/// explicit graph and none was supplied or parsed.
pub const NULL_GRAPH_IRI: &str = "http://quadwright.dev/ns#nullGraph";

/// Datatype of plain string literals, folded into simple literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Datatype of language-tagged literals, implied by the tag.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// Default number of statements an `AssertionBuffer` holds before it must be flushed.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Default size of the writer pool used by the dual statement/justification write.
///
/// One thread per concurrent writer.
pub const DEFAULT_WRITER_THREADS: usize = 2;

/// Number of statements copied per batch by ADD/COPY/MOVE.
pub const COPY_CHUNK_SIZE: usize = 10_000;

/// Default store namespace carried on the execution context.
pub const DEFAULT_NAMESPACE: &str = "kb";

/// Default lexicon namespace carried on the execution context.
pub const DEFAULT_LEXICON_NAMESPACE: &str = "kb.lex";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a single N-Triples/N-Quads line.
///
/// Longer lines are rejected by the parser. This prevents memory exhaustion
/// from malformed input without a line terminator.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;
