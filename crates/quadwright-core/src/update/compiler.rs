//! Sequential dispatch of update operations.

use super::{
    DeleteInsertEvaluator, ErrorPolicy, GraphOperationExecutor, LiteralDataExecutor,
    UpdateExecutionContext, UpdateOperation,
};
use crate::UpdateError;
use crate::loader::DataLoader;
use crate::query::QueryEvaluator;
use std::time::Instant;

/// Runs update sequences against a connection.
///
/// Operations execute one at a time in input order. The first failure aborts
/// the rest of the sequence; operations already executed stay applied.
pub struct UpdatePlanCompiler<'a> {
    evaluator: &'a dyn QueryEvaluator,
    loader: &'a DataLoader,
    graphs: GraphOperationExecutor,
    data: LiteralDataExecutor,
    patterns: DeleteInsertEvaluator,
}

impl std::fmt::Debug for UpdatePlanCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePlanCompiler").finish_non_exhaustive()
    }
}

impl<'a> UpdatePlanCompiler<'a> {
    pub fn new(evaluator: &'a dyn QueryEvaluator, loader: &'a DataLoader) -> Self {
        Self {
            evaluator,
            loader,
            graphs: GraphOperationExecutor,
            data: LiteralDataExecutor,
            patterns: DeleteInsertEvaluator,
        }
    }

    /// Execute the sequence, then commit unless commit is managed externally.
    ///
    /// A failure is reported as `OperationFailed` carrying the index and kind
    /// of the operation that failed.
    pub fn execute(
        &self,
        operations: impl IntoIterator<Item = UpdateOperation>,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<(), UpdateError> {
        let start = Instant::now();
        let mut executed = 0usize;

        for (index, op) in operations.into_iter().enumerate() {
            let kind = op.kind();
            tracing::debug!(index, %kind, "dispatching update operation");

            self.dispatch(&op, ctx)
                .map_err(|source| UpdateError::OperationFailed {
                    index,
                    kind,
                    source: Box::new(source),
                })?;
            executed += 1;
        }

        if !ctx.cluster {
            ctx.store.commit()?;
        }

        tracing::debug!(
            operations = executed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            committed = !ctx.cluster,
            "update sequence complete"
        );
        Ok(())
    }

    /// Run one operation, applying its error policy.
    fn dispatch(
        &self,
        op: &UpdateOperation,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<(), UpdateError> {
        let kind = op.kind();
        if ctx.disabled.contains(&kind) {
            return Err(UpdateError::UnsupportedUpdate(format!(
                "{} is not enabled",
                kind
            )));
        }

        let result = match op {
            UpdateOperation::Create(op) => self.graphs.create(op, ctx).map(|()| 0),
            UpdateOperation::Add(op) => self.graphs.add(op, ctx),
            UpdateOperation::Copy(op) => self.graphs.copy(op, ctx),
            UpdateOperation::Move(op) => self.graphs.move_graph(op, ctx),
            UpdateOperation::Clear(op) => self.graphs.clear(op, ctx),
            UpdateOperation::Drop(op) => self.graphs.drop_graph(op, ctx),
            UpdateOperation::InsertData(op) => self.data.insert_data(op, ctx),
            UpdateOperation::DeleteData(op) => self.data.delete_data(op, ctx),
            UpdateOperation::Load(op) => self
                .loader
                .load(&op.source, &op.target, ctx)
                .map(|report| report.statements),
            UpdateOperation::DeleteInsert(op) => self.patterns.execute(self.evaluator, op, ctx),
        };

        match result {
            Ok(affected) => {
                tracing::debug!(%kind, affected, "update operation applied");
                Ok(())
            }
            Err(e) if op.policy() == ErrorPolicy::Silent && e.is_silenceable() => {
                tracing::warn!(%kind, error = %e, "silent update failed, continuing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
