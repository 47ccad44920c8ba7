//! Update operation model.
//!
//! `UpdateOperation` is a closed enum with one case per update kind. Payloads
//! derive serde so a sequence of operations can be read from JSON:
//!
//! ```json
//! [
//!   { "op": "insert_data", "statements": [ ... ] },
//!   { "op": "copy", "source": { "iri": "http://ex/a" }, "target": { "iri": "http://ex/b" } },
//!   { "op": "load", "source": "file:///data/people.nq", "policy": "silent" }
//! ]
//! ```

use crate::pattern::{GroupPattern, QuadTemplate};
use crate::{Statement, Term};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ten update kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Create,
    Add,
    Copy,
    Move,
    Clear,
    Drop,
    InsertData,
    DeleteData,
    Load,
    DeleteInsert,
}

impl UpdateKind {
    /// Every kind, in dispatch order.
    pub const ALL: [UpdateKind; 10] = [
        Self::Create,
        Self::Add,
        Self::Copy,
        Self::Move,
        Self::Clear,
        Self::Drop,
        Self::InsertData,
        Self::DeleteData,
        Self::Load,
        Self::DeleteInsert,
    ];
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Add => "ADD",
            Self::Copy => "COPY",
            Self::Move => "MOVE",
            Self::Clear => "CLEAR",
            Self::Drop => "DROP",
            Self::InsertData => "INSERT DATA",
            Self::DeleteData => "DELETE DATA",
            Self::Load => "LOAD",
            Self::DeleteInsert => "DELETE/INSERT",
        };
        f.write_str(name)
    }
}

/// A graph address. Unresolved means "unaddressed / default graph".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphRef(Option<Term>);

impl GraphRef {
    /// A concrete graph.
    #[must_use]
    pub fn named(graph: Term) -> Self {
        Self(Some(graph))
    }

    /// The default graph.
    #[must_use]
    pub fn unresolved() -> Self {
        Self(None)
    }

    /// The reserved null graph.
    #[must_use]
    pub fn null_graph() -> Self {
        Self(Some(Term::null_graph()))
    }

    #[must_use]
    pub fn resolved(&self) -> Option<&Term> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0.is_some()
    }
}

impl From<Term> for GraphRef {
    fn from(graph: Term) -> Self {
        Self::named(graph)
    }
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(g) => write!(f, "{}", g),
            None => f.write_str("DEFAULT"),
        }
    }
}

/// A dataset scope for CLEAR/DROP without an explicit graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphScope {
    DefaultGraph,
    NamedGraphs,
}

impl fmt::Display for GraphScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultGraph => f.write_str("DEFAULT"),
            Self::NamedGraphs => f.write_str("NAMED"),
        }
    }
}

/// What to do when an operation hits a silenceable failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Propagate and abort the rest of the sequence.
    #[default]
    Strict,
    /// Log a warning and treat the operation as a no-op.
    Silent,
}

// =============================================================================
// PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGraph {
    #[serde(default)]
    pub target: GraphRef,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

/// Payload of ADD, COPY and MOVE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTransfer {
    #[serde(default)]
    pub source: GraphRef,
    #[serde(default)]
    pub target: GraphRef,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

/// Payload of CLEAR and DROP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropGraph {
    #[serde(default)]
    pub target: GraphRef,
    #[serde(default)]
    pub scope: Option<GraphScope>,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

/// Payload of INSERT DATA and DELETE DATA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadGraph {
    /// URL of the document to load.
    pub source: String,
    /// Default context for statements parsed without one.
    #[serde(default)]
    pub target: GraphRef,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

/// Payload of a pattern-driven DELETE or INSERT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInsert {
    pub where_clause: GroupPattern,
    #[serde(default)]
    pub delete: Option<QuadTemplate>,
    #[serde(default)]
    pub insert: Option<QuadTemplate>,
    #[serde(default)]
    pub policy: ErrorPolicy,
}

// =============================================================================
// UPDATE OPERATION
// =============================================================================

/// One update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UpdateOperation {
    Create(CreateGraph),
    Add(GraphTransfer),
    Copy(GraphTransfer),
    Move(GraphTransfer),
    Clear(DropGraph),
    Drop(DropGraph),
    InsertData(GraphData),
    DeleteData(GraphData),
    Load(LoadGraph),
    DeleteInsert(DeleteInsert),
}

impl UpdateOperation {
    #[must_use]
    pub fn create(target: impl Into<GraphRef>) -> Self {
        Self::Create(CreateGraph {
            target: target.into(),
            policy: ErrorPolicy::Strict,
        })
    }

    #[must_use]
    pub fn add(source: impl Into<GraphRef>, target: impl Into<GraphRef>) -> Self {
        Self::Add(transfer(source, target))
    }

    #[must_use]
    pub fn copy(source: impl Into<GraphRef>, target: impl Into<GraphRef>) -> Self {
        Self::Copy(transfer(source, target))
    }

    #[must_use]
    pub fn move_graph(source: impl Into<GraphRef>, target: impl Into<GraphRef>) -> Self {
        Self::Move(transfer(source, target))
    }

    /// CLEAR one graph.
    #[must_use]
    pub fn clear(target: impl Into<GraphRef>) -> Self {
        Self::Clear(DropGraph {
            target: target.into(),
            ..DropGraph::default()
        })
    }

    /// DROP one graph.
    #[must_use]
    pub fn drop_graph(target: impl Into<GraphRef>) -> Self {
        Self::Drop(DropGraph {
            target: target.into(),
            ..DropGraph::default()
        })
    }

    /// CLEAR ALL.
    #[must_use]
    pub fn clear_all() -> Self {
        Self::Clear(DropGraph::default())
    }

    /// CLEAR DEFAULT or CLEAR NAMED.
    #[must_use]
    pub fn clear_scope(scope: GraphScope) -> Self {
        Self::Clear(DropGraph {
            scope: Some(scope),
            ..DropGraph::default()
        })
    }

    #[must_use]
    pub fn insert_data(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self::InsertData(GraphData {
            statements: statements.into_iter().collect(),
            policy: ErrorPolicy::Strict,
        })
    }

    #[must_use]
    pub fn delete_data(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self::DeleteData(GraphData {
            statements: statements.into_iter().collect(),
            policy: ErrorPolicy::Strict,
        })
    }

    #[must_use]
    pub fn load(source: impl Into<String>) -> Self {
        Self::Load(LoadGraph {
            source: source.into(),
            target: GraphRef::unresolved(),
            policy: ErrorPolicy::Strict,
        })
    }

    /// LOAD into a default context.
    #[must_use]
    pub fn load_into(source: impl Into<String>, target: impl Into<GraphRef>) -> Self {
        Self::Load(LoadGraph {
            source: source.into(),
            target: target.into(),
            policy: ErrorPolicy::Strict,
        })
    }

    /// DELETE { template } WHERE { pattern }.
    #[must_use]
    pub fn delete_where(where_clause: GroupPattern, template: QuadTemplate) -> Self {
        Self::DeleteInsert(DeleteInsert {
            where_clause,
            delete: Some(template),
            insert: None,
            policy: ErrorPolicy::Strict,
        })
    }

    /// INSERT { template } WHERE { pattern }.
    #[must_use]
    pub fn insert_where(where_clause: GroupPattern, template: QuadTemplate) -> Self {
        Self::DeleteInsert(DeleteInsert {
            where_clause,
            delete: None,
            insert: Some(template),
            policy: ErrorPolicy::Strict,
        })
    }

    /// The same operation with the SILENT modifier.
    #[must_use]
    pub fn silent(self) -> Self {
        self.with_policy(ErrorPolicy::Silent)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        *self.policy_mut() = policy;
        self
    }

    #[must_use]
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Create(_) => UpdateKind::Create,
            Self::Add(_) => UpdateKind::Add,
            Self::Copy(_) => UpdateKind::Copy,
            Self::Move(_) => UpdateKind::Move,
            Self::Clear(_) => UpdateKind::Clear,
            Self::Drop(_) => UpdateKind::Drop,
            Self::InsertData(_) => UpdateKind::InsertData,
            Self::DeleteData(_) => UpdateKind::DeleteData,
            Self::Load(_) => UpdateKind::Load,
            Self::DeleteInsert(_) => UpdateKind::DeleteInsert,
        }
    }

    #[must_use]
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            Self::Create(op) => op.policy,
            Self::Add(op) | Self::Copy(op) | Self::Move(op) => op.policy,
            Self::Clear(op) | Self::Drop(op) => op.policy,
            Self::InsertData(op) | Self::DeleteData(op) => op.policy,
            Self::Load(op) => op.policy,
            Self::DeleteInsert(op) => op.policy,
        }
    }

    fn policy_mut(&mut self) -> &mut ErrorPolicy {
        match self {
            Self::Create(op) => &mut op.policy,
            Self::Add(op) | Self::Copy(op) | Self::Move(op) => &mut op.policy,
            Self::Clear(op) | Self::Drop(op) => &mut op.policy,
            Self::InsertData(op) | Self::DeleteData(op) => &mut op.policy,
            Self::Load(op) => &mut op.policy,
            Self::DeleteInsert(op) => &mut op.policy,
        }
    }
}

fn transfer(source: impl Into<GraphRef>, target: impl Into<GraphRef>) -> GraphTransfer {
    GraphTransfer {
        source: source.into(),
        target: target.into(),
        policy: ErrorPolicy::Strict,
    }
}
