//! # Query Module
//!
//! Derived construct queries and the evaluator capability that runs them.
//!
//! - `ConstructQuery`: a WHERE pattern, its projection, and a flat template
//! - `QueryEvaluator`: the capability the update path calls into
//! - `PatternEvaluator`: the default evaluator, a nested-loop join over
//!   `QuadStore::get_statements`
//!
//! Solutions are computed eagerly at the snapshot of the call. Template
//! instantiation is lazy and driven by the returned cursor.

use crate::pattern::{ConstructTemplate, GroupPattern, QuadPattern, TermPattern, Variable};
use crate::store::{QuadStore, StatementCursor, StatementPattern};
use crate::{Statement, Term, UpdateError};
use std::collections::{BTreeMap, BTreeSet};

/// One solution: a binding of variables to terms.
pub type Solution = BTreeMap<Variable, Term>;

/// A read-only query whose output is statements built from its solutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructQuery {
    /// The pattern producing solutions.
    pub where_clause: GroupPattern,
    /// Variables visible to the template.
    pub projection: BTreeSet<Variable>,
    /// The statements to build per solution.
    pub template: ConstructTemplate,
}

impl ConstructQuery {
    #[must_use]
    pub fn new(
        where_clause: GroupPattern,
        projection: BTreeSet<Variable>,
        template: ConstructTemplate,
    ) -> Self {
        Self {
            where_clause,
            projection,
            template,
        }
    }
}

/// Evaluates derived construct queries.
pub trait QueryEvaluator: Send + Sync {
    /// Evaluate against the store as of `timestamp`.
    ///
    /// The returned cursor is lazy, finite and non-restartable.
    fn evaluate_construct(
        &self,
        store: &dyn QuadStore,
        query: &ConstructQuery,
        timestamp: u64,
    ) -> Result<StatementCursor, UpdateError>;
}

// =============================================================================
// PATTERN EVALUATOR
// =============================================================================

/// Nested-loop evaluator over the store's pattern reads.
///
/// Quad patterns that are not graph-scoped match in every context.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEvaluator;

impl PatternEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// All solutions of a pattern, starting from the empty solution.
    pub fn solutions(
        &self,
        store: &dyn QuadStore,
        pattern: &GroupPattern,
    ) -> Result<Vec<Solution>, UpdateError> {
        eval_group(store, pattern, None, vec![Solution::new()])
    }
}

impl QueryEvaluator for PatternEvaluator {
    fn evaluate_construct(
        &self,
        store: &dyn QuadStore,
        query: &ConstructQuery,
        timestamp: u64,
    ) -> Result<StatementCursor, UpdateError> {
        let solutions: Vec<Solution> = self
            .solutions(store, &query.where_clause)?
            .into_iter()
            .map(|mut s| {
                s.retain(|v, _| query.projection.contains(v));
                s
            })
            .collect();

        tracing::debug!(
            solutions = solutions.len(),
            template = query.template.quads().len(),
            timestamp,
            "construct query evaluated"
        );

        let template = query.template.clone();
        let statements = solutions
            .into_iter()
            .enumerate()
            .flat_map(move |(row, solution)| {
                template
                    .quads()
                    .iter()
                    .filter_map(|quad| instantiate(quad, &solution, row))
                    .collect::<Vec<_>>()
            })
            .map(Ok);

        Ok(StatementCursor::new(statements))
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

fn eval_group(
    store: &dyn QuadStore,
    pattern: &GroupPattern,
    active_graph: Option<&TermPattern>,
    input: Vec<Solution>,
) -> Result<Vec<Solution>, UpdateError> {
    match pattern {
        GroupPattern::Basic(quads) => {
            let mut solutions = input;
            for quad in quads {
                let mut next = Vec::new();
                for solution in &solutions {
                    match_quad(store, quad, active_graph, solution, &mut next)?;
                }
                solutions = next;
            }
            Ok(solutions)
        }
        GroupPattern::Join(groups) => {
            let mut solutions = input;
            for group in groups {
                solutions = eval_group(store, group, active_graph, solutions)?;
            }
            Ok(solutions)
        }
        GroupPattern::Optional { required, optional } => {
            let mut out = Vec::new();
            for solution in eval_group(store, required, active_graph, input)? {
                let extended = eval_group(store, optional, active_graph, vec![solution.clone()])?;
                if extended.is_empty() {
                    out.push(solution);
                } else {
                    out.extend(extended);
                }
            }
            Ok(out)
        }
        GroupPattern::Union(branches) => {
            let mut out = Vec::new();
            for branch in branches {
                out.extend(eval_group(store, branch, active_graph, input.clone())?);
            }
            Ok(out)
        }
        GroupPattern::Graph { name, pattern } => eval_group(store, pattern, Some(name), input),
        GroupPattern::Minus { base, excluded } => {
            let left = eval_group(store, base, active_graph, input)?;
            let right = eval_group(store, excluded, active_graph, vec![Solution::new()])?;
            Ok(left
                .into_iter()
                .filter(|l| !right.iter().any(|r| minus_removes(l, r)))
                .collect())
        }
    }
}

/// MINUS drops a solution only when compatible and sharing a variable.
fn minus_removes(left: &Solution, right: &Solution) -> bool {
    let mut shared = false;
    for (var, value) in right {
        if let Some(bound) = left.get(var) {
            if bound != value {
                return false;
            }
            shared = true;
        }
    }
    shared
}

fn resolve<'a>(position: &'a TermPattern, solution: &'a Solution) -> Option<&'a Term> {
    match position {
        TermPattern::Term(t) => Some(t),
        TermPattern::Var(v) => solution.get(v),
    }
}

/// Bind a pattern position to a term, failing on conflict.
fn bind(position: &TermPattern, value: &Term, solution: &mut Solution) -> bool {
    match position {
        TermPattern::Term(t) => t == value,
        TermPattern::Var(v) => match solution.get(v) {
            Some(bound) => bound == value,
            None => {
                solution.insert(v.clone(), value.clone());
                true
            }
        },
    }
}

fn match_quad(
    store: &dyn QuadStore,
    quad: &QuadPattern,
    active_graph: Option<&TermPattern>,
    solution: &Solution,
    out: &mut Vec<Solution>,
) -> Result<(), UpdateError> {
    let graph = quad.graph.as_ref().or(active_graph);
    let lookup = StatementPattern {
        subject: resolve(&quad.subject, solution).cloned(),
        predicate: resolve(&quad.predicate, solution).cloned(),
        object: resolve(&quad.object, solution).cloned(),
        context: graph.and_then(|g| resolve(g, solution)).cloned(),
    };

    for statement in store.get_statements(&lookup, true)? {
        let statement = statement?;
        let mut extended = solution.clone();
        let graph_ok = match (graph, &statement.context) {
            (None, _) => true,
            (Some(g), Some(c)) => bind(g, c, &mut extended),
            (Some(_), None) => false,
        };
        if graph_ok
            && bind(&quad.subject, &statement.subject, &mut extended)
            && bind(&quad.predicate, &statement.predicate, &mut extended)
            && bind(&quad.object, &statement.object, &mut extended)
        {
            out.push(extended);
        }
    }
    Ok(())
}

/// Build one template statement for a solution.
///
/// Blank nodes are renamed per solution row. Quads with an unbound variable,
/// a literal subject or graph, or a non-IRI predicate produce nothing.
fn instantiate(quad: &QuadPattern, solution: &Solution, row: usize) -> Option<Statement> {
    let term = |position: &TermPattern| -> Option<Term> {
        match position {
            TermPattern::Var(v) => solution.get(v).cloned(),
            TermPattern::Term(Term::Blank(label)) => Some(Term::blank(format!("{label}_{row}"))),
            TermPattern::Term(t) => Some(t.clone()),
        }
    };

    let subject = term(&quad.subject).filter(Term::is_resource)?;
    let predicate = term(&quad.predicate).filter(Term::is_iri)?;
    let object = term(&quad.object)?;
    let context = match &quad.graph {
        None => None,
        Some(g) => Some(term(g).filter(Term::is_resource)?),
    };

    Some(Statement {
        subject,
        predicate,
        object,
        context,
    })
}
