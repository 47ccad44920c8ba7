//! # Pattern Algebra
//!
//! The WHERE-pattern and template shapes consumed by pattern-driven updates.
//!
//! - `GroupPattern`: basic quad patterns combined by join, optional, union,
//!   graph scoping and minus
//! - `QuadTemplate`: the DELETE/INSERT template, default-graph quads plus
//!   per-graph blocks, flattened into a `ConstructTemplate` for evaluation
//! - `StaticAnalysis`: which variables a pattern may bind

use crate::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// VARIABLES AND TERM PATTERNS
// =============================================================================

/// A query variable, named without the leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable(String);

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// One position of a quad pattern: a variable or a fixed term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermPattern {
    Var(Variable),
    Term(Term),
}

impl TermPattern {
    /// Shorthand for a variable position.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(Variable::new(name))
    }

    #[must_use]
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Var(v) => Some(v),
            Self::Term(_) => None,
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<Variable> for TermPattern {
    fn from(var: Variable) -> Self {
        Self::Var(var)
    }
}

/// A quad pattern. A missing graph position means "not graph-scoped".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadPattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
    #[serde(default)]
    pub graph: Option<TermPattern>,
}

impl QuadPattern {
    #[must_use]
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: None,
        }
    }

    /// The same pattern scoped to a graph.
    #[must_use]
    pub fn in_graph(mut self, graph: impl Into<TermPattern>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    /// Variables appearing in any position, graph included.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        [
            Some(&self.subject),
            Some(&self.predicate),
            Some(&self.object),
            self.graph.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(TermPattern::as_variable)
    }
}

// =============================================================================
// GROUP PATTERNS
// =============================================================================

/// A WHERE-clause pattern tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPattern {
    /// A conjunction of quad patterns.
    Basic(Vec<QuadPattern>),
    /// A conjunction of groups, evaluated left to right.
    Join(Vec<GroupPattern>),
    /// Left join: solutions of `required`, extended by `optional` where it matches.
    Optional {
        required: Box<GroupPattern>,
        optional: Box<GroupPattern>,
    },
    /// Concatenation of the branch solutions.
    Union(Vec<GroupPattern>),
    /// Patterns scoped to a named graph (fixed or variable).
    Graph {
        name: TermPattern,
        pattern: Box<GroupPattern>,
    },
    /// Solutions of `base` not compatible with any solution of `excluded`.
    Minus {
        base: Box<GroupPattern>,
        excluded: Box<GroupPattern>,
    },
}

impl GroupPattern {
    /// A basic group from quad patterns.
    #[must_use]
    pub fn basic(patterns: impl IntoIterator<Item = QuadPattern>) -> Self {
        Self::Basic(patterns.into_iter().collect())
    }

    #[must_use]
    pub fn optional(required: GroupPattern, optional: GroupPattern) -> Self {
        Self::Optional {
            required: Box::new(required),
            optional: Box::new(optional),
        }
    }

    #[must_use]
    pub fn graph(name: impl Into<TermPattern>, pattern: GroupPattern) -> Self {
        Self::Graph {
            name: name.into(),
            pattern: Box::new(pattern),
        }
    }

    #[must_use]
    pub fn minus(base: GroupPattern, excluded: GroupPattern) -> Self {
        Self::Minus {
            base: Box::new(base),
            excluded: Box::new(excluded),
        }
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// A block of template quads sharing one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTemplate {
    pub name: TermPattern,
    pub quads: Vec<QuadPattern>,
}

/// A DELETE or INSERT template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadTemplate {
    /// Quads outside any GRAPH block.
    #[serde(default)]
    pub default_graph: Vec<QuadPattern>,
    /// GRAPH blocks.
    #[serde(default)]
    pub graphs: Vec<GraphTemplate>,
}

impl QuadTemplate {
    /// A template without GRAPH blocks.
    #[must_use]
    pub fn of(quads: impl IntoIterator<Item = QuadPattern>) -> Self {
        Self {
            default_graph: quads.into_iter().collect(),
            graphs: Vec::new(),
        }
    }

    /// Add a GRAPH block.
    #[must_use]
    pub fn with_graph(
        mut self,
        name: impl Into<TermPattern>,
        quads: impl IntoIterator<Item = QuadPattern>,
    ) -> Self {
        self.graphs.push(GraphTemplate {
            name: name.into(),
            quads: quads.into_iter().collect(),
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default_graph.is_empty() && self.graphs.iter().all(|g| g.quads.is_empty())
    }

    /// Collapse GRAPH blocks into per-quad graph positions.
    ///
    /// The graph of a block overrides whatever graph its quads carried.
    #[must_use]
    pub fn flatten(&self) -> ConstructTemplate {
        let mut quads = self.default_graph.clone();
        for block in &self.graphs {
            quads.extend(
                block
                    .quads
                    .iter()
                    .cloned()
                    .map(|q| q.in_graph(block.name.clone())),
            );
        }
        ConstructTemplate(quads)
    }
}

/// A flat construct template, one quad pattern per output statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructTemplate(pub Vec<QuadPattern>);

impl ConstructTemplate {
    #[must_use]
    pub fn quads(&self) -> &[QuadPattern] {
        &self.0
    }
}

// =============================================================================
// STATIC ANALYSIS
// =============================================================================

/// Compile-time facts about patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAnalysis;

impl StaticAnalysis {
    /// The variables a pattern may bind in some solution.
    ///
    /// Without `recursive`, only quad patterns directly in this group count.
    /// With it, nested groups are descended: both optional and union branches
    /// contribute, while the excluded side of a minus never binds anything.
    #[must_use]
    pub fn maybe_produced_bindings(pattern: &GroupPattern, recursive: bool) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        Self::collect(pattern, recursive, true, &mut vars);
        vars
    }

    fn collect(pattern: &GroupPattern, recursive: bool, top: bool, out: &mut BTreeSet<Variable>) {
        match pattern {
            GroupPattern::Basic(quads) => {
                for quad in quads {
                    out.extend(quad.variables().cloned());
                }
            }
            GroupPattern::Join(groups) => {
                for group in groups {
                    let direct = matches!(group, GroupPattern::Basic(_));
                    if recursive || (top && direct) {
                        Self::collect(group, recursive, false, out);
                    }
                }
            }
            GroupPattern::Optional { required, optional } => {
                if recursive {
                    Self::collect(required, recursive, false, out);
                    Self::collect(optional, recursive, false, out);
                }
            }
            GroupPattern::Union(branches) => {
                if recursive {
                    for branch in branches {
                        Self::collect(branch, recursive, false, out);
                    }
                }
            }
            GroupPattern::Graph { name, pattern } => {
                if let Some(v) = name.as_variable() {
                    out.insert(v.clone());
                }
                if recursive {
                    Self::collect(pattern, recursive, false, out);
                }
            }
            GroupPattern::Minus { base, .. } => {
                if recursive {
                    Self::collect(base, recursive, false, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/{local}"))
    }

    fn vars(names: &[&str]) -> BTreeSet<Variable> {
        names.iter().map(|n| Variable::new(*n)).collect()
    }

    #[test]
    fn basic_pattern_binds_every_position() {
        let p = GroupPattern::basic([QuadPattern::new(
            TermPattern::var("s"),
            ex("p"),
            TermPattern::var("o"),
        )
        .in_graph(TermPattern::var("g"))]);

        assert_eq!(
            StaticAnalysis::maybe_produced_bindings(&p, false),
            vars(&["g", "o", "s"])
        );
    }

    #[test]
    fn recursive_analysis_sees_nested_groups() {
        let required = GroupPattern::basic([QuadPattern::new(
            TermPattern::var("s"),
            ex("p"),
            TermPattern::var("o"),
        )]);
        let optional = GroupPattern::basic([QuadPattern::new(
            TermPattern::var("s"),
            ex("label"),
            TermPattern::var("label"),
        )]);
        let union = GroupPattern::Union(vec![
            GroupPattern::basic([QuadPattern::new(
                TermPattern::var("a"),
                ex("p"),
                ex("o"),
            )]),
            GroupPattern::graph(
                TermPattern::var("g"),
                GroupPattern::basic([QuadPattern::new(
                    TermPattern::var("b"),
                    ex("p"),
                    ex("o"),
                )]),
            ),
        ]);
        let p = GroupPattern::Join(vec![GroupPattern::optional(required, optional), union]);

        assert_eq!(
            StaticAnalysis::maybe_produced_bindings(&p, true),
            vars(&["a", "b", "g", "label", "o", "s"])
        );
        assert!(StaticAnalysis::maybe_produced_bindings(&p, false).is_empty());
    }

    #[test]
    fn minus_never_binds() {
        let p = GroupPattern::minus(
            GroupPattern::basic([QuadPattern::new(
                TermPattern::var("s"),
                ex("p"),
                ex("o"),
            )]),
            GroupPattern::basic([QuadPattern::new(
                TermPattern::var("s"),
                ex("q"),
                TermPattern::var("hidden"),
            )]),
        );

        assert_eq!(StaticAnalysis::maybe_produced_bindings(&p, true), vars(&["s"]));
    }

    #[test]
    fn flatten_scopes_graph_blocks() {
        let template = QuadTemplate::of([QuadPattern::new(
            TermPattern::var("s"),
            ex("p"),
            ex("o"),
        )])
        .with_graph(
            ex("g"),
            [QuadPattern::new(TermPattern::var("s"), ex("q"), ex("o"))],
        );

        let flat = template.flatten();
        assert_eq!(flat.quads().len(), 2);
        assert_eq!(flat.quads()[0].graph, None);
        assert_eq!(flat.quads()[1].graph, Some(TermPattern::Term(ex("g"))));
    }

    #[test]
    fn empty_template() {
        assert!(QuadTemplate::default().is_empty());
        assert!(QuadTemplate::default().with_graph(ex("g"), []).is_empty());
    }
}
