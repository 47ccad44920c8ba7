//! INSERT DATA and DELETE DATA: literal statements, no variables.

use super::{GraphData, UpdateExecutionContext};
use crate::store::StatementPattern;
use crate::{StatementKind, UpdateError};

/// Executes literal data operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralDataExecutor;

impl LiteralDataExecutor {
    /// Add every statement. Contextless statements land in the null graph
    /// in quads mode. Returns the number written.
    pub fn insert_data(
        &self,
        op: &GraphData,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let batch: Vec<_> = op
            .statements
            .iter()
            .cloned()
            .map(|s| ctx.normalize(s))
            .collect();
        ctx.store.add_statements(&batch, StatementKind::Explicit)
    }

    /// Remove every statement by exact match. In quads mode a contextless
    /// statement is removed from the null graph only. Returns the number removed.
    pub fn delete_data(
        &self,
        op: &GraphData,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<usize, UpdateError> {
        let mut removed = 0;
        for statement in &op.statements {
            let statement = ctx.normalize(statement.clone());
            removed += ctx
                .store
                .remove_statements(&StatementPattern::exact(&statement))?;
        }
        Ok(removed)
    }
}
