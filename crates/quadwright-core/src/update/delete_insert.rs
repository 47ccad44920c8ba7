//! Pattern-driven DELETE or INSERT.
//!
//! The WHERE pattern is wrapped in a derived construct query whose template is
//! the flattened DELETE or INSERT template. Each constructed statement is then
//! removed or added. A request carrying both templates is unsupported: whether
//! the insert half sees the deletions of the same match is left undecided.

use super::{DeleteInsert, UpdateExecutionContext};
use crate::UpdateError;
use crate::pattern::StaticAnalysis;
use crate::query::{ConstructQuery, QueryEvaluator};
use crate::store::StatementPattern;

/// Executes DELETE/INSERT ... WHERE through a query evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteInsertEvaluator;

impl DeleteInsertEvaluator {
    /// Returns the number of statements added or removed.
    pub fn execute(
        &self,
        evaluator: &dyn QueryEvaluator,
        op: &DeleteInsert,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let (template, deleting) = match (&op.delete, &op.insert) {
            (Some(_), Some(_)) => {
                return Err(UpdateError::UnsupportedUpdate(
                    "DELETE and INSERT over one WHERE match".to_string(),
                ));
            }
            (Some(delete), None) => (delete, true),
            (None, Some(insert)) => (insert, false),
            (None, None) => {
                return Err(UpdateError::PreconditionViolation(
                    "DELETE/INSERT without a template".to_string(),
                ));
            }
        };

        let projection = StaticAnalysis::maybe_produced_bindings(&op.where_clause, true);
        let query = ConstructQuery::new(op.where_clause.clone(), projection, template.flatten());

        // Dropped on every exit path, including a failing write below.
        let cursor = evaluator.evaluate_construct(ctx.store, &query, ctx.timestamp)?;

        let mut affected = 0;
        for statement in cursor {
            let statement = ctx.normalize(statement?);
            if deleting {
                affected += ctx
                    .store
                    .remove_statements(&StatementPattern::exact(&statement))?;
            } else if ctx.store.add_statement(&statement)? {
                affected += 1;
            }
        }

        tracing::debug!(
            affected,
            mode = if deleting { "delete" } else { "insert" },
            "pattern update applied"
        );
        Ok(affected)
    }
}
