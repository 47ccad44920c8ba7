//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the update engine:
//! - RDF terms (`Term`, `Literal`)
//! - Statements and their storage kind (`Statement`, `StatementKind`)
//! - Derivation records for truth maintenance (`Justification`)
//! - Error types (`UpdateError`)
//!
//! ## Ordering
//!
//! All value types implement `Ord` so the in-memory store can keep them in
//! `BTreeMap`/`BTreeSet` and iterate in a deterministic order.

use crate::primitives::{NULL_GRAPH_IRI, RDF_LANG_STRING, XSD_STRING};
use crate::update::UpdateKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// TERMS
// =============================================================================

/// A literal value: lexical form plus optional datatype IRI or language tag.
///
/// Every constructor, and deserialization, yields the canonical form: the
/// language tag is lower-cased, `xsd:string` is folded into a simple literal,
/// and a language tag drops any datatype. Equal facts therefore compare equal
/// whether they were parsed, built in code or read from JSON.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "LiteralFields")]
pub struct Literal {
    /// The lexical form, unescaped.
    pub lexical: String,
    /// Datatype IRI, absent for simple and language-tagged literals.
    pub datatype: Option<String>,
    /// Language tag, lower-cased.
    pub language: Option<String>,
}

/// Wire shape of a `Literal` before normalisation.
#[derive(Deserialize)]
struct LiteralFields {
    lexical: String,
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl From<LiteralFields> for Literal {
    fn from(fields: LiteralFields) -> Self {
        Self::new(fields.lexical, fields.datatype, fields.language)
    }
}

impl Literal {
    /// A literal in canonical form.
    #[must_use]
    pub fn new(
        lexical: impl Into<String>,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Self {
        let language = language
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.to_ascii_lowercase());
        let datatype = match (&language, datatype) {
            (Some(_), _) => None,
            (None, Some(dt)) if dt == XSD_STRING || dt == RDF_LANG_STRING => None,
            (None, dt) => dt,
        };
        Self {
            lexical: lexical.into(),
            datatype,
            language,
        }
    }

    /// A simple literal with no datatype and no language.
    #[must_use]
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self::new(lexical, None, None)
    }

    /// A typed literal. `xsd:string` yields a simple literal.
    #[must_use]
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::new(lexical, Some(datatype.into()), None)
    }

    /// A language-tagged literal.
    #[must_use]
    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::new(lexical, None, Some(language.into()))
    }
}

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// An absolute IRI, stored without angle brackets.
    Iri(String),
    /// A blank node label, stored without the `_:` prefix.
    Blank(String),
    /// A literal.
    Literal(Literal),
}

impl Term {
    /// Create an IRI term.
    #[must_use]
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Create a blank node term.
    #[must_use]
    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    /// Create a simple literal term.
    #[must_use]
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal::simple(lexical))
    }

    /// The reserved graph used when quads require a context and none was given.
    #[must_use]
    pub fn null_graph() -> Self {
        Self::Iri(NULL_GRAPH_IRI.to_string())
    }

    /// True for the null-graph sentinel.
    #[must_use]
    pub fn is_null_graph(&self) -> bool {
        matches!(self, Self::Iri(iri) if iri == NULL_GRAPH_IRI)
    }

    #[must_use]
    pub fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Terms allowed in subject or context position.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Iri(_) | Self::Blank(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{}>", escape_iri(iri)),
            Self::Blank(label) => write!(f, "_:{}", label),
            Self::Literal(lit) => {
                write!(f, "\"{}\"", escape_lexical(&lit.lexical))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{}>", escape_iri(dt))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Escape an IRI for N-Triples output.
///
/// Characters the IRI grammar forbids are written as `\uXXXX`, which the
/// parser decodes back to the same IRI.
fn escape_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len());
    for ch in iri.chars() {
        match ch {
            '\u{0}'..='\u{20}' | '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                out.push_str(&format!("\\u{:04X}", ch as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Escape a lexical form for N-Triples output.
fn escape_lexical(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    for ch in lexical.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

// =============================================================================
// STATEMENTS
// =============================================================================

/// A (subject, predicate, object[, context]) fact.
///
/// Equality and ordering cover all four components. Statements are values:
/// re-contextualising one produces a new statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// The graph, absent for triples.
    #[serde(default)]
    pub context: Option<Term>,
}

impl Statement {
    /// Create a triple (no context).
    #[must_use]
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: None,
        }
    }

    /// Create a quad.
    #[must_use]
    pub fn quad(subject: Term, predicate: Term, object: Term, context: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: Some(context),
        }
    }

    /// The same fact in another context (or in none).
    #[must_use]
    pub fn with_context(&self, context: Option<Term>) -> Self {
        Self {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
            context,
        }
    }

    /// Normalise the context for a store in the given mode.
    ///
    /// Triples mode drops any context. Quads mode keeps an explicit context
    /// and otherwise uses `default`.
    #[must_use]
    pub fn contextualize(self, quads: bool, default: Option<&Term>) -> Self {
        let context = if !quads {
            None
        } else {
            self.context.or_else(|| default.cloned())
        };
        Self { context, ..self }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(c) = &self.context {
            write!(f, " {}", c)?;
        }
        write!(f, " .")
    }
}

/// How a statement entered the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum StatementKind {
    /// Asserted by a user update or a load.
    #[default]
    Explicit,
    /// Entailed by a rule.
    Inferred,
}

// =============================================================================
// JUSTIFICATION
// =============================================================================

/// A derivation record linking an entailed statement to the rule and
/// antecedents that produced it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Justification {
    /// Name of the rule that fired.
    pub rule: String,
    /// The entailed statement.
    pub head: Statement,
    /// The antecedent statements bound by the rule body.
    pub tail: Vec<Statement>,
}

impl Justification {
    #[must_use]
    pub fn new(rule: impl Into<String>, head: Statement, tail: Vec<Statement>) -> Self {
        Self {
            rule: rule.into(),
            head,
            tail,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the update engine.
///
/// - `UnsupportedUpdate` and `PreconditionViolation` are never silenced
/// - `GraphExists` and `LoadFailed` are silenced by an operation's SILENT policy
/// - Library code never panics; every failure is a variant here
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The operation kind or option combination is not implemented.
    #[error("Unsupported update: {0}")]
    UnsupportedUpdate(String),

    /// A caller or upstream construction defect.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// CREATE addressed a graph that already has statements.
    #[error("Graph exists: {0}")]
    GraphExists(Term),

    /// LOAD could not fetch, recognise or parse its source.
    #[error("Could not load: url={url}, cause={reason}")]
    LoadFailed { url: String, reason: String },

    /// One half of the dual statement/justification write failed.
    #[error("Concurrent write failed: {0}")]
    ConcurrentWriteFailure(#[source] Box<UpdateError>),

    /// An operation inside an update sequence failed.
    #[error("Update operation {index} ({kind}) failed: {source}")]
    OperationFailed {
        index: usize,
        kind: UpdateKind,
        #[source]
        source: Box<UpdateError>,
    },

    /// A document could not be parsed.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// The query evaluator failed.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// The statement store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl UpdateError {
    /// Failures a SILENT operation turns into a logged no-op.
    #[must_use]
    pub fn is_silenceable(&self) -> bool {
        matches!(self, Self::GraphExists(_) | Self::LoadFailed { .. })
    }

    /// The failure underneath an `OperationFailed` wrapper.
    #[must_use]
    pub fn root_cause(&self) -> &UpdateError {
        match self {
            Self::OperationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for UpdateError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
